use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Occurrences of the term in the document, always >= 1.
    pub tf: u32,
}

/// Why a restored posting was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PostingRejection {
    ZeroFrequency,
    UnknownDocument,
    DuplicateDocument,
}

/// In-memory term -> postings mapping plus the doc_id -> path registry.
///
/// Posting lists are kept sorted by `doc_id` and never empty: a term is
/// only present once it has at least one posting. Every posting refers to a
/// registered document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
    docs: HashMap<DocId, String>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Register `doc_id` under `path` and add one posting per distinct token.
    ///
    /// Ids must be unique within an index; a repeated id is rejected and the
    /// index is left untouched.
    pub fn add_document<S: AsRef<str>>(
        &mut self,
        doc_id: DocId,
        path: impl Into<String>,
        tokens: &[S],
    ) -> Result<(), IndexError> {
        if self.docs.contains_key(&doc_id) {
            return Err(IndexError::DuplicateDocument(doc_id));
        }
        self.docs.insert(doc_id, path.into());

        let mut tf_counts: HashMap<&str, u32> = HashMap::new();
        for token in tokens {
            *tf_counts.entry(token.as_ref()).or_insert(0) += 1;
        }
        for (term, tf) in tf_counts {
            let list = self.postings.entry(term.to_owned()).or_default();
            insert_sorted(list, Posting { doc_id, tf });
        }
        Ok(())
    }

    /// Postings for an already-normalized term; empty when the term is unknown.
    pub fn lookup(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn doc_count(&self) -> usize { self.docs.len() }

    /// Registered path of `doc_id`, or `""` when the id is unknown.
    pub fn doc_path(&self, doc_id: DocId) -> &str {
        self.docs.get(&doc_id).map(String::as_str).unwrap_or("")
    }

    pub fn contains_document(&self, doc_id: DocId) -> bool { self.docs.contains_key(&doc_id) }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize { self.postings.len() }

    /// Total number of postings across all terms.
    pub fn posting_count(&self) -> usize { self.postings.values().map(Vec::len).sum() }

    /// Total term count of a document, reproduced from its postings.
    pub fn doc_length(&self, doc_id: DocId) -> u64 {
        self.postings
            .values()
            .filter_map(|list| list.binary_search_by_key(&doc_id, |p| p.doc_id).ok().map(|i| list[i].tf as u64))
            .sum()
    }

    /// Total term count of every registered document, computed in one pass
    /// over the postings. Documents without terms map to 0.
    pub fn doc_lengths(&self) -> HashMap<DocId, u64> {
        let mut lengths: HashMap<DocId, u64> = self.docs.keys().map(|id| (*id, 0)).collect();
        for p in self.postings.values().flatten() {
            *lengths.entry(p.doc_id).or_insert(0) += p.tf as u64;
        }
        lengths
    }

    /// Registered documents in unspecified order.
    pub fn documents(&self) -> impl Iterator<Item = (DocId, &str)> + '_ {
        self.docs.iter().map(|(id, path)| (*id, path.as_str()))
    }

    /// Terms with their postings in unspecified order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &[Posting])> + '_ {
        self.postings.iter().map(|(term, list)| (term.as_str(), list.as_slice()))
    }

    /// Fold a fragment built over a disjoint set of documents into `self`.
    ///
    /// Fails without modifying `self` if any document id is already present.
    pub fn merge(&mut self, other: InvertedIndex) -> Result<(), IndexError> {
        if let Some(dup) = other.docs.keys().copied().filter(|id| self.docs.contains_key(id)).min() {
            return Err(IndexError::DuplicateDocument(dup));
        }
        self.docs.extend(other.docs);
        for (term, incoming) in other.postings {
            match self.postings.get_mut(&term) {
                Some(list) => {
                    list.extend(incoming);
                    list.sort_by_key(|p| p.doc_id);
                }
                None => {
                    self.postings.insert(term, incoming);
                }
            }
        }
        Ok(())
    }

    /// Register a document while restoring a persisted index. Returns false
    /// if the id was already present.
    pub(crate) fn restore_document(&mut self, doc_id: DocId, path: String) -> bool {
        if self.docs.contains_key(&doc_id) {
            return false;
        }
        self.docs.insert(doc_id, path);
        true
    }

    /// Add a single persisted posting, enforcing the index invariants.
    pub(crate) fn restore_posting(&mut self, term: &str, posting: Posting) -> Result<(), PostingRejection> {
        if posting.tf == 0 {
            return Err(PostingRejection::ZeroFrequency);
        }
        if !self.docs.contains_key(&posting.doc_id) {
            return Err(PostingRejection::UnknownDocument);
        }
        if let Some(list) = self.postings.get(term) {
            if list.binary_search_by_key(&posting.doc_id, |p| p.doc_id).is_ok() {
                return Err(PostingRejection::DuplicateDocument);
            }
        }
        let list = self.postings.entry(term.to_owned()).or_default();
        insert_sorted(list, posting);
        Ok(())
    }
}

fn insert_sorted(list: &mut Vec<Posting>, posting: Posting) {
    match list.last() {
        Some(last) if last.doc_id > posting.doc_id => {
            let at = list.partition_point(|p| p.doc_id < posting.doc_id);
            list.insert(at, posting);
        }
        _ => list.push(posting),
    }
}
