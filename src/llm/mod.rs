use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::config::defaults::GEMINI_BASE_URL;
use crate::core::config::{LlmProviderKind, LlmSettings};

pub mod gemini;
pub mod openai;
pub mod provider;
pub mod types;

pub use gemini::GeminiProvider;
pub use openai::OpenAiCompatProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest};

const OPENAI_COMPAT_DEFAULT_URL: &str = "http://127.0.0.1:1234";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM returned no text ({0})")]
    EmptyResponse(String),

    #[error("Missing LLM credential: {0}")]
    MissingCredential(String),
}

pub(crate) fn map_send_error(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Request(err.to_string())
    }
}

pub fn build_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, GenerationError> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    match settings.provider {
        LlmProviderKind::Gemini => Ok(Arc::new(GeminiProvider::new(
            settings.base_url.clone(),
            settings.model.clone(),
            settings.api_key.clone().unwrap_or_default(),
            timeout,
        )?)),
        LlmProviderKind::OpenaiCompatible => {
            // The default base URL points at Gemini; local servers need their own.
            let base_url = if settings.base_url == GEMINI_BASE_URL {
                OPENAI_COMPAT_DEFAULT_URL.to_string()
            } else {
                settings.base_url.clone()
            };
            Ok(Arc::new(OpenAiCompatProvider::new(
                base_url,
                settings.model.clone(),
                settings.api_key.clone(),
                timeout,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ApiKey;

    #[test]
    fn gemini_requires_a_key() {
        let settings = LlmSettings::default();
        assert!(matches!(
            build_provider(&settings),
            Err(GenerationError::MissingCredential(_))
        ));
    }

    #[test]
    fn providers_are_selected_by_kind() {
        let gemini = build_provider(&LlmSettings {
            api_key: Some(ApiKey::new("k")),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(gemini.name(), "gemini");
        assert_eq!(gemini.model(), "gemini-flash-latest");

        let local = build_provider(&LlmSettings {
            provider: LlmProviderKind::OpenaiCompatible,
            model: "qwen2.5-7b-instruct".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(local.name(), "openai_compatible");
    }
}
