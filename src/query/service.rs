use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::answer::AnswerGenerator;
use crate::core::errors::ErrorKind;
use crate::embedding::Embedder;
use crate::rag::{ChunkSearchResult, StoreError, VectorStore};

use super::{Answer, QueryError, RequestStage, SourceRef};

/// Why a validated request ended on the fallback answer.
#[derive(Debug)]
struct Failure {
    /// Last stage the request completed.
    stage: RequestStage,
    kind: ErrorKind,
    detail: String,
}

/// Last completed stage of an in-flight request, readable after a timeout drops it.
struct StageTracker(Mutex<RequestStage>);

impl StageTracker {
    fn new(stage: RequestStage) -> Self {
        Self(Mutex::new(stage))
    }

    fn advance(&self, stage: RequestStage) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = stage;
    }

    fn current(&self) -> RequestStage {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Embeds a question, retrieves the nearest chunks and asks the generator.
///
/// Holds only shared read-only handles, so one instance serves concurrent
/// requests. Every validated request yields a non-empty answer: collaborator
/// failures are logged and replaced with the configured fallback text.
#[derive(Clone)]
pub struct QueryService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn AnswerGenerator>,
    top_k: usize,
    fallback_answer: String,
    timeout: Option<Duration>,
}

impl QueryService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn AnswerGenerator>,
        top_k: usize,
        fallback_answer: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            top_k: top_k.max(1),
            fallback_answer: fallback_answer.into(),
            timeout: None,
        }
    }

    /// Bounds the embed → retrieve → generate path; expiry yields the fallback.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn ask(&self, question: &str) -> Result<Answer, QueryError> {
        tracing::debug!(stage = %RequestStage::Received, "Question received");

        let question = question.trim();
        if question.is_empty() {
            tracing::info!(
                stage = %RequestStage::Rejected,
                kind = %ErrorKind::InvalidInput,
                "Rejected blank question"
            );
            return Err(QueryError::InvalidInput);
        }
        tracing::debug!(stage = %RequestStage::Validated, "Question validated");
        tracing::info!("Question: {}", question);

        match self.execute(question).await {
            Ok(answer) => {
                tracing::debug!(stage = %RequestStage::Answered, "Answer ready");
                tracing::info!(
                    sources = answer.sources.len(),
                    "Answered question: {}",
                    question
                );
                Ok(answer)
            }
            Err(failure) => {
                tracing::warn!(
                    stage = %RequestStage::Failed,
                    failed_after = %failure.stage,
                    kind = %failure.kind,
                    "Falling back for question {:?}: {}",
                    question,
                    failure.detail
                );
                Ok(self.fallback())
            }
        }
    }

    async fn execute(&self, question: &str) -> Result<Answer, Failure> {
        let progress = StageTracker::new(RequestStage::Validated);
        let Some(limit) = self.timeout else {
            return self.run(question, &progress).await;
        };

        match tokio::time::timeout(limit, self.run(question, &progress)).await {
            Ok(result) => result,
            Err(_) => {
                let stage = progress.current();
                // Before retrieval completes the hang is in the embedder or store.
                let kind = match stage {
                    RequestStage::Retrieved => ErrorKind::Generation,
                    _ => ErrorKind::Infra,
                };
                Err(Failure {
                    stage,
                    kind,
                    detail: format!("request exceeded {:?}", limit),
                })
            }
        }
    }

    async fn run(&self, question: &str, progress: &StageTracker) -> Result<Answer, Failure> {
        let embedding = self
            .embedder
            .embed_query(question)
            .await
            .map_err(|e| Failure {
                stage: RequestStage::Validated,
                kind: ErrorKind::Infra,
                detail: e.to_string(),
            })?;
        progress.advance(RequestStage::Embedded);
        tracing::debug!(stage = %RequestStage::Embedded, dims = embedding.len(), "Question embedded");

        let retrieved = match self.store.search(&embedding, self.top_k).await {
            Ok(results) => results,
            Err(StoreError::EmptyStore) => {
                tracing::warn!(
                    kind = %ErrorKind::EmptyStore,
                    "Vector store is empty; answering without context"
                );
                Vec::new()
            }
            Err(e) => {
                return Err(Failure {
                    stage: RequestStage::Embedded,
                    kind: ErrorKind::Infra,
                    detail: e.to_string(),
                })
            }
        };
        progress.advance(RequestStage::Retrieved);
        tracing::debug!(
            stage = %RequestStage::Retrieved,
            hits = retrieved.len(),
            "Chunks retrieved"
        );

        let sources = source_refs(&retrieved);
        let text = self
            .generator
            .answer(question, &retrieved)
            .await
            .map_err(|e| Failure {
                stage: RequestStage::Retrieved,
                kind: ErrorKind::Generation,
                detail: e.to_string(),
            })?;

        if text.trim().is_empty() {
            return Err(Failure {
                stage: RequestStage::Retrieved,
                kind: ErrorKind::Generation,
                detail: "generator returned blank text".to_string(),
            });
        }

        Ok(Answer {
            text,
            sources,
            fallback: false,
        })
    }

    fn fallback(&self) -> Answer {
        Answer {
            text: self.fallback_answer.clone(),
            sources: Vec::new(),
            fallback: true,
        }
    }
}

fn source_refs(results: &[ChunkSearchResult]) -> Vec<SourceRef> {
    results
        .iter()
        .map(|r| SourceRef {
            source: r.chunk.source.clone(),
            chunk_index: r.chunk.chunk_index,
            score: r.score,
        })
        .collect()
}
