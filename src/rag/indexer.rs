//! Offline index build: PDFs → chunks → embeddings → persisted store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::sqlite::SqliteVectorStore;
use super::store::StoredChunk;
use super::StoreError;
use crate::embedding::{Embedder, EmbeddingError};
use crate::ingest::{Chunk, Chunker, IngestError, PdfDirectoryLoader, TextExtractor};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Ingestion task failed: {0}")]
    Task(String),
}

/// Summary of one build.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub documents: usize,
    pub skipped_files: usize,
    pub chunks: usize,
    pub persist_dir: PathBuf,
}

pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    batch_size: usize,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: Chunker, batch_size: usize) -> Self {
        Self {
            embedder,
            chunker,
            batch_size: batch_size.max(1),
            extractor: None,
        }
    }

    /// Replaces the PDF text extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub async fn run(&self, source_dir: &Path, persist_dir: &Path) -> Result<IndexReport, IndexError> {
        let (documents, skipped_files, chunks) = self.load_chunks(source_dir).await?;
        tracing::info!(
            "Loaded {} documents ({} skipped) into {} chunks",
            documents,
            skipped_files,
            chunks.len()
        );
        if chunks.is_empty() {
            tracing::warn!(
                "No text found in {}; the store will be empty",
                source_dir.display()
            );
        }

        let entries = self.embed_chunks(chunks).await?;
        let chunk_count = entries.len();
        SqliteVectorStore::build(persist_dir, self.embedder.model_id(), entries).await?;

        Ok(IndexReport {
            documents,
            skipped_files,
            chunks: chunk_count,
            persist_dir: persist_dir.to_path_buf(),
        })
    }

    /// PDF parsing is blocking, so it runs on the blocking pool.
    async fn load_chunks(
        &self,
        source_dir: &Path,
    ) -> Result<(usize, usize, Vec<Chunk>), IndexError> {
        let loader = match &self.extractor {
            Some(extractor) => PdfDirectoryLoader::with_extractor(source_dir, extractor.clone()),
            None => PdfDirectoryLoader::new(source_dir),
        };
        let chunker = self.chunker;

        tokio::task::spawn_blocking(move || -> Result<_, IngestError> {
            let mut documents = loader.documents()?;
            let mut count = 0;
            let mut chunks = Vec::new();
            for document in documents.by_ref() {
                count += 1;
                chunks.extend(chunker.chunk(&document));
            }
            Ok((count, documents.skipped(), chunks))
        })
        .await
        .map_err(|e| IndexError::Task(e.to_string()))?
        .map_err(IndexError::from)
    }

    async fn embed_chunks(
        &self,
        chunks: Vec<Chunk>,
    ) -> Result<Vec<(StoredChunk, Vec<f32>)>, IndexError> {
        let mut entries = Vec::with_capacity(chunks.len());
        let total = chunks.len();

        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            let inputs: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&inputs).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                ))
                .into());
            }
            entries.extend(
                batch
                    .iter()
                    .cloned()
                    .map(StoredChunk::from)
                    .zip(vectors),
            );
            tracing::debug!(
                "Embedded batch {} ({}/{} chunks)",
                batch_no + 1,
                entries.len(),
                total
            );
        }

        Ok(entries)
    }
}
