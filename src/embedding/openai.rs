use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{Embedder, EmbeddingError};

/// Embedder for servers exposing the OpenAI `/v1/embeddings` route
/// (text-embeddings-inference, llama.cpp, LM Studio, Ollama, ...).
#[derive(Clone)]
pub struct OpenAiCompatEmbedder {
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl OpenAiCompatEmbedder {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }
}

#[async_trait]
impl Embedder for OpenAiCompatEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let res = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    EmbeddingError::ModelUnavailable(format!("{}: {}", self.base_url, e))
                } else {
                    EmbeddingError::Request(e.to_string())
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let message = format!("{} returned {}: {}", self.endpoint(), status, text);
            return Err(if status == StatusCode::NOT_FOUND {
                EmbeddingError::ModelUnavailable(message)
            } else {
                EmbeddingError::Request(message)
            });
        }

        let payload: EmbeddingsResponse = res
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        order_embeddings(payload.data, inputs.len())
    }
}

fn order_embeddings(
    mut items: Vec<EmbeddingItem>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if items.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            items.len()
        )));
    }
    if items.iter().all(|item| item.index.is_some()) {
        items.sort_by_key(|item| item.index.unwrap_or(0));
    }
    Ok(items.into_iter().map(|item| item.embedding).collect())
}
