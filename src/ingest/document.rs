//! PDF directory ingestion.
//!
//! Reads every `*.pdf` directly inside a directory and yields one
//! [`Document`] per file. Only the `source` path is kept as metadata.
//! Files that fail to parse are skipped with a warning.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::IngestError;

/// Raw text of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Path of the originating file.
    pub source: String,
    /// Full extracted text.
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// Turns a file into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, IngestError>;
}

/// Default extractor backed by `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, IngestError> {
        // pdf-extract panics on some malformed files instead of returning an error.
        let result = std::panic::catch_unwind(|| pdf_extract::extract_text(path));
        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(IngestError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => Err(IngestError::Parse {
                path: path.to_path_buf(),
                message: "PDF parser panicked".to_string(),
            }),
        }
    }
}

/// Lists and extracts the PDF files of one directory.
pub struct PdfDirectoryLoader {
    dir: PathBuf,
    extractor: Arc<dyn TextExtractor>,
}

impl PdfDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_extractor(dir, Arc::new(PdfTextExtractor))
    }

    pub fn with_extractor(dir: impl Into<PathBuf>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            dir: dir.into(),
            extractor,
        }
    }

    /// Lazily yields documents in sorted path order.
    ///
    /// Fails up front when the directory is missing or unreadable; per-file
    /// failures are logged and counted but never abort the iteration.
    pub fn documents(&self) -> Result<Documents, IngestError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| IngestError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    tracing::warn!("Failed to read entry in {}: {}", self.dir.display(), e);
                    None
                }
            })
            .filter(|path| path.is_file() && is_pdf(path))
            .collect();
        files.sort();

        tracing::debug!("Found {} PDF files in {}", files.len(), self.dir.display());

        Ok(Documents {
            files: files.into_iter(),
            extractor: self.extractor.clone(),
            skipped: 0,
        })
    }
}

/// Iterator returned by [`PdfDirectoryLoader::documents`].
pub struct Documents {
    files: std::vec::IntoIter<PathBuf>,
    extractor: Arc<dyn TextExtractor>,
    skipped: usize,
}

impl Documents {
    /// Number of files skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Documents {
    type Item = Document;

    fn next(&mut self) -> Option<Self::Item> {
        for path in self.files.by_ref() {
            match self.extractor.extract(&path) {
                Ok(raw) => {
                    let text = normalize_whitespace(&raw);
                    if text.is_empty() {
                        tracing::warn!("Skipping {}: no extractable text", path.display());
                        self.skipped += 1;
                        continue;
                    }
                    return Some(Document::new(path.to_string_lossy(), text));
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    self.skipped += 1;
                }
            }
        }
        None
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Collapses horizontal whitespace runs and blank-line runs left by PDF extraction.
pub fn normalize_whitespace(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static BLANK_LINES: OnceLock<Regex> = OnceLock::new();

    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t\u{00A0}]+").expect("valid regex"));
    let blank_lines =
        BLANK_LINES.get_or_init(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("valid regex"));

    let text = text.replace("\r\n", "\n").replace('\u{000C}', "\n");
    let text = spaces.replace_all(&text, " ");
    let text = blank_lines.replace_all(&text, "\n\n");
    text.trim().to_string()
}
