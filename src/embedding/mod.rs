//! Text embedding backends.
//!
//! The same [`Embedder`] instance (and therefore the same model) must serve
//! both indexing and querying; the vector store records [`Embedder::model_id`]
//! at build time and refuses to open under a different one.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::config::{EmbeddingProviderKind, EmbeddingSettings};

mod hashing;
mod openai;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiCompatEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model producing the vectors.
    fn model_id(&self) -> &str;

    /// Embeds each input, preserving order.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected 1 vector, got {}",
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }

    /// Embeds a fixed probe string and returns the vector dimension.
    ///
    /// Run once at startup; any failure means the backend cannot be used.
    async fn probe(&self) -> Result<usize, EmbeddingError> {
        let vector = self
            .embed_query("health check")
            .await
            .map_err(|e| match e {
                EmbeddingError::ModelUnavailable(msg) => EmbeddingError::ModelUnavailable(msg),
                other => EmbeddingError::ModelUnavailable(other.to_string()),
            })?;
        if vector.is_empty() {
            return Err(EmbeddingError::ModelUnavailable(format!(
                "{} returned an empty vector",
                self.model_id()
            )));
        }
        Ok(vector.len())
    }
}

pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match settings.provider {
        EmbeddingProviderKind::OpenaiCompatible => Ok(Arc::new(OpenAiCompatEmbedder::new(
            settings.base_url.clone(),
            settings.model.clone(),
            std::time::Duration::from_secs(settings.timeout_secs),
        )?)),
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(settings.dimensions))),
    }
}
