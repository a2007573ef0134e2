//! SQLite-backed vector store.
//!
//! A store is a directory holding one SQLite file with the chunk text,
//! minimal metadata and little-endian `f32` embedding blobs, plus a
//! `store_meta` table pinning the embedding model. Building writes a fresh
//! directory next to the target and swaps it in; opening loads every entry
//! into memory once and serves brute-force cosine search from there.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, StoredChunk, VectorStore};
use super::vector_math::rank_descending_by_cosine;
use super::StoreError;

const DB_FILE: &str = "vectors.sqlite3";

pub struct SqliteVectorStore {
    model_id: Option<String>,
    dimensions: Option<usize>,
    chunks: Vec<StoredChunk>,
    embeddings: Vec<Vec<f32>>,
}

impl SqliteVectorStore {
    /// Creates a new persisted store at `persist_dir`, replacing whatever was there.
    pub async fn build(
        persist_dir: &Path,
        model_id: &str,
        entries: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<Self, StoreError> {
        let dimensions = common_dimension(&entries)?;
        let staging = staging_dir(persist_dir);

        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| io_error(&staging, e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| io_error(&staging, e))?;

        let pool = connect(&staging.join(DB_FILE)).await?;
        init_schema(&pool).await?;

        let mut tx = pool.begin().await.map_err(backend)?;
        for (chunk, embedding) in &entries {
            sqlx::query(
                "INSERT OR REPLACE INTO chunks (chunk_id, content, source, chunk_index, start_offset, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(chunk.chunk_index as i64)
            .bind(chunk.start_offset as i64)
            .bind(serialize_embedding(embedding))
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        let meta = [
            ("embedding_model", model_id.to_string()),
            (
                "dimensions",
                dimensions.map(|d| d.to_string()).unwrap_or_default(),
            ),
            ("created_at", chrono::Utc::now().to_rfc3339()),
        ];
        for (key, value) in meta {
            sqlx::query("INSERT OR REPLACE INTO store_meta (key, value) VALUES (?1, ?2)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        pool.close().await;

        if persist_dir.exists() {
            fs::remove_dir_all(persist_dir).map_err(|e| io_error(persist_dir, e))?;
        }
        if let Some(parent) = persist_dir.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        fs::rename(&staging, persist_dir).map_err(|e| io_error(persist_dir, e))?;

        tracing::info!(
            "Built vector store at {} with {} entries (model {})",
            persist_dir.display(),
            entries.len(),
            model_id
        );

        Self::open(persist_dir, model_id).await
    }

    /// Opens a store for querying. A missing directory yields an empty store.
    pub async fn open(persist_dir: &Path, model_id: &str) -> Result<Self, StoreError> {
        fs::create_dir_all(persist_dir).map_err(|e| io_error(persist_dir, e))?;

        let pool = connect(&persist_dir.join(DB_FILE)).await?;
        init_schema(&pool).await?;

        let stored_model = read_meta(&pool, "embedding_model").await?;
        if let Some(stored) = stored_model.as_deref() {
            if stored != model_id {
                pool.close().await;
                return Err(StoreError::ModelMismatch {
                    stored: stored.to_string(),
                    configured: model_id.to_string(),
                });
            }
        }
        let dimensions = read_meta(&pool, "dimensions")
            .await?
            .and_then(|v| v.parse::<usize>().ok());

        let rows = sqlx::query(
            "SELECT chunk_id, content, source, chunk_index, start_offset, embedding
             FROM chunks
             ORDER BY rowid",
        )
        .fetch_all(&pool)
        .await
        .map_err(backend)?;
        pool.close().await;

        let mut chunks = Vec::with_capacity(rows.len());
        let mut embeddings = Vec::with_capacity(rows.len());
        for row in &rows {
            let (chunk, embedding) = row_to_entry(row)?;
            if embedding.is_empty() {
                tracing::warn!("Ignoring chunk {} without embedding", chunk.chunk_id);
                continue;
            }
            chunks.push(chunk);
            embeddings.push(embedding);
        }

        tracing::debug!(
            "Opened vector store {} ({} entries)",
            persist_dir.display(),
            chunks.len()
        );

        Ok(Self {
            model_id: stored_model,
            dimensions,
            chunks,
            embeddings,
        })
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.chunks.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ChunkSearchResult>, StoreError> {
        if k == 0 {
            return Err(StoreError::InvalidArgument("k must be positive".to_string()));
        }
        if self.chunks.is_empty() {
            return Err(StoreError::EmptyStore);
        }
        if let Some(expected) = self.dimensions {
            if query_embedding.len() != expected {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: query_embedding.len(),
                });
            }
        }

        let ranked = rank_descending_by_cosine(query_embedding, &self.embeddings)?;
        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| ChunkSearchResult {
                chunk: self.chunks[idx].clone(),
                score,
            })
            .collect())
    }
}

async fn connect(db_path: &Path) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .synchronous(SqliteSynchronous::Normal);

    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(backend)
}

async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS chunks (
            chunk_id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT '',
            chunk_index INTEGER NOT NULL DEFAULT 0,
            start_offset INTEGER NOT NULL DEFAULT 0,
            embedding BLOB NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(backend)?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(backend)?;

    Ok(())
}

async fn read_meta(pool: &SqlitePool, key: &str) -> Result<Option<String>, StoreError> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(backend)?;
    Ok(value.filter(|v| !v.is_empty()))
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<(StoredChunk, Vec<f32>), StoreError> {
    let chunk_index: i64 = row.try_get("chunk_index").map_err(backend)?;
    let start_offset: i64 = row.try_get("start_offset").map_err(backend)?;
    let blob: Vec<u8> = row.try_get("embedding").map_err(backend)?;

    let chunk = StoredChunk {
        chunk_id: row.try_get("chunk_id").map_err(backend)?,
        content: row.try_get("content").map_err(backend)?,
        source: row.try_get("source").map_err(backend)?,
        chunk_index: chunk_index.max(0) as usize,
        start_offset: start_offset.max(0) as usize,
    };
    Ok((chunk, deserialize_embedding(&blob)))
}

/// All vectors must be non-empty and share one length; `None` for an empty batch.
fn common_dimension(entries: &[(StoredChunk, Vec<f32>)]) -> Result<Option<usize>, StoreError> {
    let Some((_, first)) = entries.first() else {
        return Ok(None);
    };
    if first.is_empty() {
        return Err(StoreError::InvalidArgument(
            "embeddings must not be empty".to_string(),
        ));
    }
    let expected = first.len();
    if let Some((chunk, embedding)) = entries.iter().find(|(_, e)| e.len() != expected) {
        tracing::error!("Chunk {} has a mismatched embedding", chunk.chunk_id);
        return Err(StoreError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(Some(expected))
}

fn staging_dir(persist_dir: &Path) -> PathBuf {
    let name = persist_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "store".to_string());
    persist_dir.with_file_name(format!("{}.building", name))
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
