use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::answer::{AnswerGenerator, LlmAnswerGenerator};
use crate::core::config::{AppPaths, Settings};
use crate::embedding::{build_embedder, Embedder};
use crate::llm::build_provider;
use crate::query::QueryService;
use crate::rag::{SqliteVectorStore, VectorStore};

pub mod error;

pub use error::InitializationError;

/// Process-wide state shared by every route.
///
/// The embedder, store and generator are built once here and handed to the
/// [`QueryService`]; nothing below reaches for globals.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub query: QueryService,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds the live collaborators from settings.
    ///
    /// 1. Probes the embedding backend (fatal when unreachable)
    /// 2. Opens the vector store under the same embedding model
    /// 3. Builds the LLM provider and answer generator
    pub async fn initialize(
        paths: &AppPaths,
        settings: Settings,
    ) -> Result<Arc<Self>, InitializationError> {
        let embedder = build_embedder(&settings.embedding)?;
        let dims = embedder.probe().await?;
        tracing::info!(
            "Embedding backend ready: {} ({} dimensions)",
            embedder.model_id(),
            dims
        );

        let persist_dir = paths.resolve(&settings.rag.persist_dir);
        let store = SqliteVectorStore::open(&persist_dir, embedder.model_id()).await?;
        if store.is_empty() {
            tracing::warn!(
                "Vector store at {} is empty; run store-index before querying",
                persist_dir.display()
            );
        } else {
            tracing::info!(
                "Vector store at {} holds {} chunks",
                persist_dir.display(),
                store.len()
            );
        }

        let provider = build_provider(&settings.llm)?;
        tracing::info!(
            "LLM provider ready: {} ({})",
            provider.name(),
            provider.model()
        );
        let generator = LlmAnswerGenerator::new(provider, settings.llm.temperature)
            .with_max_tokens(settings.llm.max_output_tokens);

        Ok(Self::from_parts(
            settings,
            embedder,
            Arc::new(store),
            Arc::new(generator),
        ))
    }

    /// Assembles state from ready collaborators.
    pub fn from_parts(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Arc<Self> {
        let query = QueryService::new(
            embedder,
            store,
            generator,
            settings.rag.top_k,
            settings.service.fallback_answer.clone(),
        )
        .with_timeout(Duration::from_secs(settings.service.request_timeout_secs));

        Arc::new(Self {
            settings: Arc::new(settings),
            query,
            started_at: Utc::now(),
        })
    }
}
