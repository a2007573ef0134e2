//! VectorStore trait: the read side of the persisted chunk index.
//!
//! Stores are built once offline and only queried afterwards, so the trait
//! exposes no write path. The SQLite implementation lives in `sqlite`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::ingest::Chunk;

/// A persisted chunk with its minimal metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub content: String,
    /// Originating file path.
    pub source: String,
    pub chunk_index: usize,
    pub start_offset: usize,
}

impl From<Chunk> for StoredChunk {
    fn from(chunk: Chunk) -> Self {
        Self {
            chunk_id: chunk.chunk_id,
            content: chunk.text,
            source: chunk.source,
            chunk_index: chunk.chunk_index,
            start_offset: chunk.start_offset,
        }
    }
}

/// One entry of a retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embedding model the store was built with, if it has been built.
    fn model_id(&self) -> Option<&str>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize, StoreError>;

    /// Up to `k` nearest entries, ordered by non-increasing similarity.
    ///
    /// Fails with `InvalidArgument` when `k == 0` and with `EmptyStore`
    /// when nothing has been indexed.
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ChunkSearchResult>, StoreError>;
}
