use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::llm::GenerationError;
use crate::rag::StoreError;

/// Startup failures. Any of these aborts the server.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Embedding backend unavailable: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Failed to open vector store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[from] GenerationError),
}
