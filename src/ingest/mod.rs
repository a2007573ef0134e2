//! Document ingestion: PDF loading and chunking.

use std::path::PathBuf;

use thiserror::Error;

mod chunker;
mod document;

pub use chunker::{Chunk, Chunker};
pub use document::{
    normalize_whitespace, Document, Documents, PdfDirectoryLoader, PdfTextExtractor, TextExtractor,
};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("Invalid chunker parameters: {0}")]
    InvalidParameters(String),
}
