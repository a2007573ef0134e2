//! Overlapping fixed-size chunking.
//!
//! Each chunk is filled greedily up to `max_chars`, then backs off to the
//! last whitespace boundary if one exists past the overlap region. The next
//! chunk starts exactly `overlap` characters before the previous one ended,
//! so dropping the first `overlap` characters of every chunk after the first
//! and concatenating reproduces the source text.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{ChunkerError, Document};

/// A bounded slice of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier derived from source, position and text.
    pub chunk_id: String,
    pub text: String,
    /// Inherited from the document; the only metadata retained.
    pub source: String,
    /// Position of the chunk within its source.
    pub chunk_index: usize,
    /// Character offset of the chunk start within the source text.
    pub start_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chars: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self, ChunkerError> {
        if max_chars == 0 {
            return Err(ChunkerError::InvalidParameters(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= max_chars {
            return Err(ChunkerError::InvalidParameters(format!(
                "overlap ({}) must be smaller than chunk size ({})",
                overlap, max_chars
            )));
        }
        Ok(Self { max_chars, overlap })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let hard_end = (start + self.max_chars).min(total);
            let end = if hard_end == total {
                total
            } else {
                self.back_off(&chars, start, hard_end)
            };

            let text: String = chars[start..end].iter().collect();
            chunks.push(make_chunk(&document.source, chunks.len(), start, text));

            if end == total {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }

    pub fn chunk_all<I>(&self, documents: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = Document>,
    {
        documents
            .into_iter()
            .flat_map(|doc| self.chunk(&doc))
            .collect()
    }

    /// Latest cut point after whitespace in `(start + overlap, hard_end]`, else `hard_end`.
    fn back_off(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let floor = start + self.overlap;
        (floor + 1..=hard_end)
            .rev()
            .find(|&cut| chars[cut - 1].is_whitespace())
            .unwrap_or(hard_end)
    }
}

fn make_chunk(source: &str, chunk_index: usize, start_offset: usize, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(chunk_index.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    Chunk {
        chunk_id: hex::encode(&digest[..16]),
        text,
        source: source.to_string(),
        chunk_index,
        start_offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&chunk.text);
            } else {
                out.extend(chunk.text.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(Chunker::new(0, 0).is_err());
        assert!(Chunker::new(10, 10).is_err());
        assert!(Chunker::new(10, 9).is_ok());
    }

    #[test]
    fn short_document_is_one_chunk() {
        let chunker = Chunker::new(500, 20).unwrap();
        let doc = Document::new("data/aspirin.pdf", "Aspirin reduces fever.");
        let chunks = chunker.chunk(&doc);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, doc.text);
        assert_eq!(chunks[0].source, "data/aspirin.pdf");
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn empty_document_has_no_chunks() {
        let chunker = Chunker::new(10, 2).unwrap();
        assert!(chunker.chunk(&Document::new("x", "")).is_empty());
    }

    #[test]
    fn chunks_are_bounded_and_reconstruct_the_text() {
        let chunker = Chunker::new(40, 8).unwrap();
        let text = "Paracetamol is an analgesic. It lowers fever. \
                    Dosage depends on body weight and age. Overdose damages the liver.";
        let chunks = chunker.chunk(&Document::new("doc.pdf", text));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            let len = chunk.text.chars().count();
            assert!(len <= 40, "chunk too long: {}", len);
            assert!(len > 8, "chunk too short: {}", len);
        }
        assert_eq!(reconstruct(&chunks, 8), text);
    }

    #[test]
    fn consecutive_chunks_share_the_overlap() {
        let chunker = Chunker::new(12, 4).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunker.chunk(&Document::new("alpha", text));

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let tail: String = prev[prev.len() - 4..].iter().collect();
            let head: String = pair[1].text.chars().take(4).collect();
            assert_eq!(tail, head);
            assert_eq!(pair[1].start_offset, pair[0].start_offset + prev.len() - 4);
        }
        assert_eq!(reconstruct(&chunks, 4), text);
    }

    #[test]
    fn backs_off_to_whitespace() {
        let chunker = Chunker::new(10, 2).unwrap();
        let chunks = chunker.chunk(&Document::new("s", "aaaa bbbb cccc"));
        assert_eq!(chunks[0].text, "aaaa bbbb ");
        assert_eq!(reconstruct(&chunks, 2), "aaaa bbbb cccc");
    }

    #[test]
    fn chunking_is_deterministic_and_unicode_safe() {
        let chunker = Chunker::new(7, 2).unwrap();
        let doc = Document::new("jp.pdf", "解熱鎮痛剤は発熱を下げる。用量に注意。");
        let first = chunker.chunk(&doc);
        let second = chunker.chunk(&doc);

        assert_eq!(first, second);
        assert_eq!(reconstruct(&first, 2), doc.text);
        let ids: std::collections::HashSet<_> = first.iter().map(|c| &c.chunk_id).collect();
        assert_eq!(ids.len(), first.len());
    }

    #[test]
    fn chunk_all_keeps_sources_apart() {
        let chunker = Chunker::new(100, 10).unwrap();
        let chunks = chunker.chunk_all(vec![
            Document::new("a.pdf", "Alpha text."),
            Document::new("b.pdf", "Beta text."),
        ]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source, "a.pdf");
        assert_eq!(chunks[1].source, "b.pdf");
        assert_eq!(chunks[1].chunk_index, 0);
    }
}
