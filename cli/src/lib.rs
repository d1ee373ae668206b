use anyhow::{bail, Result};
use parking_lot::Mutex;
use search_core::tokenizer::tokenize;
use search_core::{DocId, IndexError, InvertedIndex, LoadReport, SearchHit, SearchOutcome};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A document read from disk with its assigned id.
#[derive(Debug, Clone)]
pub struct SourceDoc {
    pub doc_id: DocId,
    pub path: String,
    pub text: String,
}

pub struct IndexRun {
    pub index: InvertedIndex,
    pub discovered: usize,
    /// Files that could not be read.
    pub skipped: usize,
}

/// Regular `.txt` files under `folder`, recursively, in file-name order.
pub fn discover_documents(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        let p = entry.path();
        if p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("txt") {
            files.push(p.to_path_buf());
        }
    }
    files
}

/// Read `paths` in order, assigning dense ids from 0 to the files that
/// could be read. Unreadable files are logged and left out.
pub fn read_documents(paths: &[PathBuf]) -> Vec<SourceDoc> {
    let mut docs = Vec::with_capacity(paths.len());
    for p in paths {
        match fs::read(p) {
            Ok(bytes) => docs.push(SourceDoc {
                doc_id: docs.len() as DocId,
                path: p.display().to_string(),
                text: String::from_utf8_lossy(&bytes).into_owned(),
            }),
            Err(err) => tracing::warn!(path = %p.display(), error = %err, "skipping unreadable document"),
        }
    }
    docs
}

fn build_fragment(docs: &[SourceDoc]) -> Result<InvertedIndex, IndexError> {
    let mut index = InvertedIndex::new();
    for doc in docs {
        index.add_document(doc.doc_id, doc.path.clone(), &tokenize(&doc.text))?;
    }
    Ok(index)
}

/// Tokenize and index `docs` on up to `workers` threads.
///
/// Each worker gets a contiguous slice of documents, so fragments cover
/// disjoint id ranges; they are merged in order on the calling thread.
pub fn index_documents(docs: &[SourceDoc], workers: usize) -> Result<InvertedIndex> {
    let workers = workers.clamp(1, docs.len().max(1));
    if workers == 1 {
        return Ok(build_fragment(docs)?);
    }

    let chunk = docs.len().div_ceil(workers);
    let fragments: Mutex<Vec<(usize, Result<InvertedIndex, IndexError>)>> = Mutex::new(Vec::with_capacity(workers));
    std::thread::scope(|s| {
        for (slot, part) in docs.chunks(chunk).enumerate() {
            let fragments = &fragments;
            s.spawn(move || {
                let fragment = build_fragment(part);
                fragments.lock().push((slot, fragment));
            });
        }
    });

    let mut fragments = fragments.into_inner();
    fragments.sort_by_key(|(slot, _)| *slot);
    let mut index = InvertedIndex::new();
    for (_, fragment) in fragments {
        index.merge(fragment?)?;
    }
    Ok(index)
}

/// Discover, read and index every `.txt` file under `folder`.
pub fn build_index(folder: &Path, workers: usize) -> Result<IndexRun> {
    if !folder.is_dir() {
        bail!("{} is not a directory", folder.display());
    }
    let files = discover_documents(folder);
    let docs = read_documents(&files);
    let skipped = files.len() - docs.len();
    let index = index_documents(&docs, workers)?;
    tracing::info!(num_docs = index.doc_count(), num_terms = index.term_count(), skipped, workers, "ingested documents");
    Ok(IndexRun { index, discovered: files.len(), skipped })
}

#[derive(Serialize)]
pub struct QueryReport<'a> {
    pub query: &'a str,
    pub results: &'a [SearchHit],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub empty_index: bool,
}

/// `{"query": ..., "results": [{"docid", "score", "path"}, ...]}`
pub fn render_json(query: &str, outcome: &SearchOutcome) -> Result<String> {
    let report = QueryReport {
        query,
        results: outcome.hits(),
        empty_index: matches!(outcome, SearchOutcome::EmptyIndex),
    };
    Ok(serde_json::to_string(&report)?)
}

/// One `doc <id> score=<f> path=<p>` line per hit.
pub fn render_text(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::EmptyIndex => "Index is empty.\n".to_owned(),
        SearchOutcome::Ranked { hits, .. } if hits.is_empty() => "No results.\n".to_owned(),
        SearchOutcome::Ranked { hits, .. } => {
            let mut out = String::new();
            for h in hits {
                let _ = writeln!(out, "doc {} score={} path={}", h.doc_id, h.score, h.path);
            }
            out
        }
    }
}

/// Summary of a loaded index; with `per_document`, one
/// `<doc_id> <length> <path>` line per document in id order.
pub fn render_stats(index: &InvertedIndex, report: &LoadReport, per_document: bool) -> String {
    let lengths = index.doc_lengths();
    let total: u64 = lengths.values().sum();
    let mut out = String::new();
    let _ = writeln!(out, "format: {} (version {})", report.format, report.version);
    let _ = writeln!(out, "documents: {}", index.doc_count());
    let _ = writeln!(out, "terms: {}", index.term_count());
    let _ = writeln!(out, "postings: {}", index.posting_count());
    let _ = writeln!(out, "tokens: {total}");
    if let Some(longest) = lengths.values().max() {
        let avg = total as f64 / lengths.len() as f64;
        let _ = writeln!(out, "doc length: avg {avg:.2}, max {longest}");
    }
    if report.skipped_documents + report.skipped_postings > 0 {
        let _ = writeln!(out, "skipped: {} documents, {} postings", report.skipped_documents, report.skipped_postings);
    }
    if per_document {
        let mut rows: Vec<(DocId, u64)> = lengths.into_iter().collect();
        rows.sort_by_key(|(id, _)| *id);
        for (id, len) in rows {
            let _ = writeln!(out, "{id} {len} {}", index.doc_path(id));
        }
    }
    out
}
