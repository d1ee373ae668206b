//! TF-IDF ranked retrieval over an [`InvertedIndex`].
//!
//! A query is a bag of terms optionally combined with the uppercase
//! operators `AND` and `OR`. `AND` binds tighter than `OR`, and terms
//! written next to each other are OR-ed. The operators only decide which
//! documents match; every matching document is scored as
//! `Σ tf(term, doc) * ln(N / (1 + df(term)))` over all query terms.

use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::tokenize;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Fixed cap on returned hits.
pub const MAX_RESULTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    /// Words are normalized with the document tokenizer and `AND`/`OR` are
    /// recognized as operators.
    #[default]
    Standard,
    /// Whitespace split and lowercase only, every word OR-ed.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    Term(String),
    And(Vec<QueryExpr>),
    Or(Vec<QueryExpr>),
}

impl QueryExpr {
    /// Parse `input`, returning `None` when no searchable term remains.
    pub fn parse(input: &str, mode: QueryMode) -> Option<QueryExpr> {
        match mode {
            QueryMode::Standard => parse_standard(input),
            QueryMode::Legacy => {
                let terms = input.split_whitespace().map(|w| QueryExpr::Term(w.to_lowercase())).collect();
                group(terms, QueryExpr::Or)
            }
        }
    }

    /// Term leaves in query order, duplicates included.
    pub fn terms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryExpr::Term(t) => out.push(t),
            QueryExpr::And(children) | QueryExpr::Or(children) => {
                children.iter().for_each(|c| c.collect_terms(out));
            }
        }
    }

    /// Documents satisfying the expression.
    pub fn matching_docs(&self, index: &InvertedIndex) -> HashSet<DocId> {
        match self {
            QueryExpr::Term(t) => index.lookup(t).iter().map(|p| p.doc_id).collect(),
            QueryExpr::Or(children) => children.iter().flat_map(|c| c.matching_docs(index)).collect(),
            QueryExpr::And(children) => {
                let mut iter = children.iter();
                let mut acc = match iter.next() {
                    Some(first) => first.matching_docs(index),
                    None => return HashSet::new(),
                };
                for child in iter {
                    if acc.is_empty() {
                        break;
                    }
                    let other = child.matching_docs(index);
                    acc.retain(|id| other.contains(id));
                }
                acc
            }
        }
    }
}

fn group(mut items: Vec<QueryExpr>, wrap: fn(Vec<QueryExpr>) -> QueryExpr) -> Option<QueryExpr> {
    match items.len() {
        0 => None,
        1 => items.pop(),
        _ => Some(wrap(items)),
    }
}

fn parse_standard(input: &str) -> Option<QueryExpr> {
    let mut clauses: Vec<QueryExpr> = Vec::new();
    let mut current: Vec<QueryExpr> = Vec::new();
    let mut pending_and = false;

    for word in input.split_whitespace() {
        match word {
            "AND" => pending_and = true,
            "OR" => {
                pending_and = false;
                clauses.extend(group(std::mem::take(&mut current), QueryExpr::And));
            }
            _ => {
                let leaf = group(tokenize(word).into_iter().map(QueryExpr::Term).collect(), QueryExpr::Or);
                let Some(leaf) = leaf else { continue };
                if !(pending_and && !current.is_empty()) {
                    clauses.extend(group(std::mem::take(&mut current), QueryExpr::And));
                }
                current.push(leaf);
                pending_and = false;
            }
        }
    }
    clauses.extend(group(current, QueryExpr::And));
    group(clauses, QueryExpr::Or)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(rename = "docid")]
    pub doc_id: DocId,
    pub score: f64,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The index holds no documents.
    EmptyIndex,
    /// Ranked hits, capped at [`MAX_RESULTS`]; `total_hits` counts every match.
    Ranked { hits: Vec<SearchHit>, total_hits: usize },
}

impl SearchOutcome {
    pub fn hits(&self) -> &[SearchHit] {
        match self {
            SearchOutcome::EmptyIndex => &[],
            SearchOutcome::Ranked { hits, .. } => hits,
        }
    }

    pub fn into_hits(self) -> Vec<SearchHit> {
        match self {
            SearchOutcome::EmptyIndex => Vec::new(),
            SearchOutcome::Ranked { hits, .. } => hits,
        }
    }
}

/// `ln(N / (1 + df))`, negative for terms present in most documents.
pub fn idf(doc_count: usize, df: usize) -> f64 {
    (doc_count as f64 / (1 + df) as f64).ln()
}

/// Rank documents for `query_string` using [`QueryMode::Standard`].
pub fn query(index: &InvertedIndex, query_string: &str) -> SearchOutcome {
    query_with(index, query_string, QueryMode::Standard)
}

pub fn query_with(index: &InvertedIndex, query_string: &str, mode: QueryMode) -> SearchOutcome {
    let n = index.doc_count();
    if n == 0 {
        return SearchOutcome::EmptyIndex;
    }
    let Some(expr) = QueryExpr::parse(query_string, mode) else {
        return SearchOutcome::Ranked { hits: Vec::new(), total_hits: 0 };
    };
    let matched = expr.matching_docs(index);

    let mut scores: HashMap<DocId, f64> = HashMap::new();
    for term in expr.terms() {
        let postings = index.lookup(term);
        let w = idf(n, postings.len());
        for p in postings.iter().filter(|p| matched.contains(&p.doc_id)) {
            *scores.entry(p.doc_id).or_insert(0.0) += p.tf as f64 * w;
        }
    }

    let mut scored: Vec<(DocId, f64)> = scores.into_iter().collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let total_hits = scored.len();
    let hits = scored
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(doc_id, score)| SearchHit { doc_id, score, path: index.doc_path(doc_id).to_owned() })
        .collect();
    tracing::debug!(query = query_string, total_hits, "query evaluated");
    SearchOutcome::Ranked { hits, total_hits }
}
