//! Answer generation: retrieved chunks + question → prompt → LLM text.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{ChatMessage, ChatRequest, GenerationError, LlmProvider};
use crate::rag::ChunkSearchResult;

mod prompt;

pub use prompt::{build_context, PromptTemplate, DEFAULT_MEDICAL_TEMPLATE};

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Produces answer text for `question` grounded on `chunks` (may be empty).
    async fn answer(
        &self,
        question: &str,
        chunks: &[ChunkSearchResult],
    ) -> Result<String, GenerationError>;
}

/// Single-prompt generator backed by an [`LlmProvider`].
#[derive(Clone)]
pub struct LlmAnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    temperature: f64,
    max_tokens: Option<u32>,
}

impl LlmAnswerGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, temperature: f64) -> Self {
        Self {
            provider,
            template: PromptTemplate::default(),
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, question: &str, chunks: &[ChunkSearchResult]) -> ChatRequest {
        let context = build_context(chunks);
        let prompt = self.template.render(&context, question);
        ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn answer(
        &self,
        question: &str,
        chunks: &[ChunkSearchResult],
    ) -> Result<String, GenerationError> {
        let request = self.build_request(question, chunks);
        tracing::debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            chunks = chunks.len(),
            "Requesting answer"
        );
        let text = self.provider.chat(request).await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GenerationError::EmptyResponse("blank completion".to_string()));
        }
        Ok(trimmed.to_string())
    }
}
