//! Typed settings with their default values.
//!
//! Every field is optional in `config.yml`; missing keys fall back to the
//! defaults below, which mirror the deployment the chatbot was tuned for
//! (MiniLM sentence embeddings, Gemini Flash at temperature 0.4, k = 2).

use serde::{Deserialize, Serialize};

pub const DEFAULT_FALLBACK_ANSWER: &str = "I'm sorry, I couldn't find an answer for that.";
pub const DEFAULT_SERVICE_NAME: &str = "Medical Chatbot API";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub rag: RagSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub service: ServiceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub persist_dir: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embed_batch_size: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            persist_dir: "db".to_string(),
            chunk_size: 500,
            chunk_overlap: 20,
            top_k: 2,
            embed_batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    OpenaiCompatible,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::OpenaiCompatible,
            base_url: "http://127.0.0.1:8080".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderKind {
    Gemini,
    OpenaiCompatible,
}

/// Credential that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        ApiKey(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub model: String,
    pub temperature: f64,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_output_tokens: Option<u32>,
    pub api_key: Option<ApiKey>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Gemini,
            model: "gemini-flash-latest".to_string(),
            temperature: 0.4,
            base_url: GEMINI_BASE_URL.to_string(),
            timeout_secs: 60,
            max_output_tokens: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub name: String,
    pub fallback_answer: String,
    pub request_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVICE_NAME.to_string(),
            fallback_answer: DEFAULT_FALLBACK_ANSWER.to_string(),
            request_timeout_secs: 90,
        }
    }
}
