//! Vector storage and offline indexing.
//!
//! This module provides:
//! - `VectorStore`: read-only nearest-neighbour search over persisted chunks
//! - `SqliteVectorStore`: the on-disk implementation (build once, query many)
//! - `Indexer`: the offline PDF → store pipeline

use std::path::PathBuf;

use thiserror::Error;

mod indexer;
mod sqlite;
mod store;
mod vector_math;

pub use indexer::{IndexError, IndexReport, Indexer};
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkSearchResult, StoredChunk, VectorStore};
pub use vector_math::{cosine_similarity, rank_descending_by_cosine};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Vector store is empty")]
    EmptyStore,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store was built with embedding model '{stored}' but '{configured}' is configured")]
    ModelMismatch { stored: String, configured: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store backend error: {0}")]
    Backend(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
