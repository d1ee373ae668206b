use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{Alphabetic}\p{N}]+").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "the", "and", "is", "in", "at", "of", "a", "an",
            "to", "for", "on", "by", "with", "that", "this", "it",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Split text into lowercase alphanumeric runs, dropping stop words.
///
/// Every other character acts as a separator. No stemming and no length
/// filtering is applied, and output order follows the input.
pub fn tokenize(text: &str) -> Vec<String> {
    RE.find_iter(text)
        .map(|m| lowercase_word(m.as_str()))
        .filter(|t| !t.is_empty() && !is_stopword(t))
        .collect()
}

/// Lowercase a word, keeping only the alphanumeric part of each mapping
/// (`İ` lowercases to `i` plus a combining dot).
fn lowercase_word(word: &str) -> String {
    word.chars().flat_map(char::to_lowercase).filter(|c| c.is_alphanumeric()).collect()
}
