//! Versioned on-disk representation of an [`InvertedIndex`].
//!
//! Every file starts with an envelope line `SEARCHIDX <version> <format>`
//! followed by the payload. The `text` payload is line oriented:
//!
//! ```text
//! DOCS <N>
//! <doc_id> <path>
//! <term> <doc_id>:<tf> <doc_id>:<tf> ...
//! ```
//!
//! Documents are written in ascending id order and terms in lexicographic
//! order, so saving the same index twice yields identical bytes. The
//! `bincode` payload carries the same content as a binary snapshot. Files
//! that begin directly with `DOCS` are read as unversioned text.

use crate::error::CodecError;
use crate::index::{DocId, InvertedIndex, Posting};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;

pub const FORMAT_VERSION: u32 = 1;
const MAGIC: &str = "SEARCHIDX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexFormat {
    #[default]
    Text,
    Bincode,
}

impl IndexFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexFormat::Text => "text",
            IndexFormat::Bincode => "bincode",
        }
    }
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for IndexFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(IndexFormat::Text),
            "bincode" => Ok(IndexFormat::Bincode),
            other => Err(CodecError::UnknownFormat(other.to_owned())),
        }
    }
}

/// What a load found besides the index itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub format: IndexFormat,
    /// 0 for files without an envelope line.
    pub version: u32,
    pub skipped_documents: usize,
    pub skipped_postings: usize,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    docs: Vec<(DocId, &'a str)>,
    terms: Vec<(&'a str, &'a [Posting])>,
}

#[derive(Deserialize)]
struct Snapshot {
    docs: Vec<(DocId, String)>,
    terms: Vec<(String, Vec<Posting>)>,
}

fn snapshot(index: &InvertedIndex) -> SnapshotRef<'_> {
    let mut docs: Vec<(DocId, &str)> = index.documents().collect();
    docs.sort_by_key(|(id, _)| *id);
    let mut terms: Vec<(&str, &[Posting])> = index.terms().collect();
    terms.sort_by(|a, b| a.0.cmp(b.0));
    SnapshotRef { docs, terms }
}

/// Write `index` (envelope included) to `w`.
pub fn write_index<W: Write>(index: &InvertedIndex, format: IndexFormat, w: &mut W) -> Result<(), CodecError> {
    let snap = snapshot(index);
    if format == IndexFormat::Text {
        check_text_encodable(&snap)?;
    }
    writeln!(w, "{MAGIC} {FORMAT_VERSION} {format}")?;
    match format {
        IndexFormat::Text => write_text(&snap, w),
        IndexFormat::Bincode => {
            bincode::serialize_into(w, &snap)?;
            Ok(())
        }
    }
}

fn check_text_encodable(snap: &SnapshotRef<'_>) -> Result<(), CodecError> {
    if let Some((id, _)) = snap.docs.iter().find(|(_, path)| path.contains(['\n', '\r'])) {
        return Err(CodecError::UnencodablePath(*id));
    }
    if let Some((term, _)) = snap.terms.iter().find(|(term, _)| term.is_empty() || term.contains(char::is_whitespace)) {
        return Err(CodecError::UnencodableTerm((*term).to_owned()));
    }
    Ok(())
}

fn write_text<W: Write>(snap: &SnapshotRef<'_>, w: &mut W) -> Result<(), CodecError> {
    writeln!(w, "DOCS {}", snap.docs.len())?;
    for (id, path) in &snap.docs {
        writeln!(w, "{id} {path}")?;
    }
    for (term, postings) in &snap.terms {
        write!(w, "{term}")?;
        for p in postings.iter() {
            write!(w, " {}:{}", p.doc_id, p.tf)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Serialize `index` into an in-memory buffer.
pub fn encode(index: &InvertedIndex, format: IndexFormat) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    write_index(index, format, &mut buf)?;
    Ok(buf)
}

/// Read an index from `r`, accepting both enveloped and unversioned files.
///
/// Malformed postings and document lines are skipped and counted in the
/// returned [`LoadReport`]; the remaining entries load normally.
pub fn read_index<R: BufRead>(r: &mut R) -> Result<(InvertedIndex, LoadReport), CodecError> {
    let header = next_line(r)?.ok_or(CodecError::MissingHeader)?;
    if header.starts_with("DOCS") {
        let report = LoadReport { format: IndexFormat::Text, version: 0, ..Default::default() };
        return read_text(r, header, report);
    }

    let mut parts = header.split_whitespace();
    if parts.next() != Some(MAGIC) {
        return Err(CodecError::BadHeader(header));
    }
    let version: u32 = match parts.next().and_then(|v| v.parse().ok()) {
        Some(v) => v,
        None => return Err(CodecError::BadHeader(header)),
    };
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let format: IndexFormat = match parts.next() {
        Some(f) => f.parse()?,
        None => return Err(CodecError::BadHeader(header)),
    };
    if parts.next().is_some() {
        return Err(CodecError::BadHeader(header));
    }

    let report = LoadReport { format, version, ..Default::default() };
    match format {
        IndexFormat::Text => {
            let docs_line = next_line(r)?.ok_or(CodecError::MissingHeader)?;
            read_text(r, docs_line, report)
        }
        IndexFormat::Bincode => read_bincode(r, report),
    }
}

fn read_text<R: BufRead>(
    r: &mut R,
    docs_line: String,
    mut report: LoadReport,
) -> Result<(InvertedIndex, LoadReport), CodecError> {
    let count: Option<usize> = docs_line.strip_prefix("DOCS").and_then(|rest| rest.trim().parse().ok());
    let Some(expected) = count else {
        return Err(CodecError::BadHeader(docs_line));
    };

    let mut index = InvertedIndex::new();
    for found in 0..expected {
        let line = next_line(r)?.ok_or(CodecError::Truncated { expected, found })?;
        let (id_part, path) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        let restored = match id_part.parse::<DocId>() {
            Ok(id) => index.restore_document(id, path.to_owned()),
            Err(_) => false,
        };
        if !restored {
            tracing::warn!(line = %line, "skipping malformed document entry");
            report.skipped_documents += 1;
        }
    }

    while let Some(line) = next_line(r)? {
        let mut fields = line.split_whitespace();
        let Some(term) = fields.next() else { continue };
        for token in fields {
            let outcome = parse_posting(token).ok_or(None).and_then(|p| index.restore_posting(term, p).map_err(Some));
            if let Err(reason) = outcome {
                tracing::warn!(term, token, ?reason, "skipping malformed posting");
                report.skipped_postings += 1;
            }
        }
    }
    Ok((index, report))
}

fn read_bincode<R: BufRead>(r: &mut R, mut report: LoadReport) -> Result<(InvertedIndex, LoadReport), CodecError> {
    // Decoding from a slice bounds every length prefix by the bytes present.
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    let snap: Snapshot = bincode::deserialize(&buf)?;
    let mut index = InvertedIndex::new();
    for (id, path) in snap.docs {
        if !index.restore_document(id, path) {
            tracing::warn!(doc_id = id, "skipping duplicate document entry");
            report.skipped_documents += 1;
        }
    }
    for (term, postings) in snap.terms {
        for p in postings {
            if let Err(reason) = index.restore_posting(&term, p) {
                tracing::warn!(term = %term, doc_id = p.doc_id, ?reason, "skipping malformed posting");
                report.skipped_postings += 1;
            }
        }
    }
    Ok((index, report))
}

fn parse_posting(token: &str) -> Option<Posting> {
    let (doc_id, tf) = token.split_once(':')?;
    Some(Posting { doc_id: doc_id.parse().ok()?, tf: tf.parse().ok()? })
}

fn next_line<R: BufRead>(r: &mut R) -> Result<Option<String>, CodecError> {
    let mut line = String::new();
    if r.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

/// Deserialize an index from an in-memory buffer.
pub fn decode(bytes: &[u8]) -> Result<(InvertedIndex, LoadReport), CodecError> {
    let mut reader = bytes;
    read_index(&mut reader)
}

/// Write `index` to `path`, replacing any existing file.
pub fn save(index: &InvertedIndex, path: impl AsRef<Path>, format: IndexFormat) -> Result<(), CodecError> {
    let path = path.as_ref();
    let bytes = encode(index, format)?;
    let mut f = File::create(path).map_err(|source| CodecError::Create { path: path.to_path_buf(), source })?;
    f.write_all(&bytes)?;
    f.flush()?;
    tracing::debug!(path = %path.display(), %format, bytes = bytes.len(), "index saved");
    Ok(())
}

/// Read the index stored at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<(InvertedIndex, LoadReport), CodecError> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|source| CodecError::Open { path: path.to_path_buf(), source })?;
    let (index, report) = read_index(&mut BufReader::new(f))?;
    tracing::debug!(
        path = %path.display(),
        format = %report.format,
        num_docs = index.doc_count(),
        num_terms = index.term_count(),
        skipped_postings = report.skipped_postings,
        "index loaded"
    );
    Ok((index, report))
}
