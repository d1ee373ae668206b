//! Single-node full-text search: tokenizer, inverted index, on-disk codec and
//! TF-IDF query engine.

pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod tokenizer;

pub use error::{CodecError, IndexError};
pub use index::{DocId, InvertedIndex, Posting};
pub use persist::{IndexFormat, LoadReport};
pub use query::{query, query_with, QueryExpr, QueryMode, SearchHit, SearchOutcome};
