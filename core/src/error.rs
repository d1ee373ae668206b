//! Error types for the search core.

use crate::index::DocId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or merging an index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A document id was registered twice.
    #[error("duplicate document ID: {0}")]
    DuplicateDocument(DocId),
}

/// Errors raised while saving or loading an index file.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("cannot open index file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create index file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was empty.
    #[error("missing index header")]
    MissingHeader,

    #[error("malformed header line: {0:?}")]
    BadHeader(String),

    #[error("unsupported index format version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown index format {0:?}")]
    UnknownFormat(String),

    /// Fewer document lines than announced by `DOCS <N>`.
    #[error("document block truncated: expected {expected} entries, found {found}")]
    Truncated { expected: usize, found: usize },

    /// The text format stores one document per line.
    #[error("path of document {0} contains a line break")]
    UnencodablePath(DocId),

    #[error("term {0:?} cannot be stored in the text format")]
    UnencodableTerm(String),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}
