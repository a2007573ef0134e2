use std::path::PathBuf;

use thiserror::Error;

pub mod defaults;
pub mod paths;
pub mod service;
pub mod validation;

pub use defaults::{
    ApiKey, EmbeddingProviderKind, EmbeddingSettings, LlmProviderKind, LlmSettings, RagSettings,
    ServerSettings, ServiceSettings, Settings,
};
pub use paths::AppPaths;
pub use service::ConfigService;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to map configuration onto settings: {0}")]
    Deserialize(#[source] serde_json::Error),
}
