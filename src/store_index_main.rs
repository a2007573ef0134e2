use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use medical_chatbot::core::config::{AppPaths, ConfigService};
use medical_chatbot::core::logging;
use medical_chatbot::embedding::{build_embedder, Embedder};
use medical_chatbot::ingest::Chunker;
use medical_chatbot::rag::Indexer;

/// Builds the vector store from a directory of PDF files.
#[derive(Debug, Parser)]
#[command(name = "store-index", version, about)]
struct Args {
    /// Directory containing the source `.pdf` files
    source_dir: PathBuf,

    /// Directory the vector store is written to (replaced if present)
    persist_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths.log_dir, "store_index.log");

    let settings = ConfigService::new(paths.clone())
        .load_settings()
        .context("Failed to load configuration")?;

    let embedder = build_embedder(&settings.embedding).context("Failed to build embedder")?;
    let dims = embedder
        .probe()
        .await
        .context("Embedding backend unavailable")?;
    tracing::info!("Embedding with {} ({} dimensions)", embedder.model_id(), dims);

    let chunker = Chunker::new(settings.rag.chunk_size, settings.rag.chunk_overlap)
        .context("Invalid chunking parameters")?;
    let indexer = Indexer::new(embedder, chunker, settings.rag.embed_batch_size);

    let report = indexer
        .run(&args.source_dir, &args.persist_path)
        .await
        .with_context(|| format!("Failed to index {}", args.source_dir.display()))?;

    tracing::info!(
        documents = report.documents,
        skipped = report.skipped_files,
        chunks = report.chunks,
        "Index written to {}",
        report.persist_dir.display()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
