use async_trait::async_trait;

use super::types::ChatRequest;
use super::GenerationError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "gemini", "openai_compatible")
    fn name(&self) -> &str;

    /// model identifier sent with every request
    fn model(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest) -> Result<String, GenerationError>;
}
