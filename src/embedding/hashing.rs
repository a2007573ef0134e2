use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{Embedder, EmbeddingError};

/// Local feature-hashing embedder.
///
/// Lower-cased alphanumeric tokens are hashed into `dimensions` signed
/// buckets and the result is L2-normalised. Needs no model download or
/// network, so it backs offline setups and tests. Similarity is lexical.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model_id: format!("hashing-{}", dimensions),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::cosine_similarity;

    #[test]
    fn embedding_is_deterministic_and_normalised() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_text("Aspirin reduces fever.");
        let b = embedder.embed_text("Aspirin reduces fever.");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_words_score_higher_than_unrelated_text() {
        let embedder = HashingEmbedder::new(256);
        let doc = embedder.embed_text("Aspirin reduces fever.");
        let related = embedder.embed_text("What reduces fever?");
        let unrelated = embedder.embed_text("Insulin regulates glucose");

        let related_score = cosine_similarity(&doc, &related).unwrap();
        let unrelated_score = cosine_similarity(&doc, &unrelated).unwrap();
        assert!(related_score > unrelated_score);
    }

    #[test]
    fn text_without_tokens_is_the_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert!(embedder.embed_text(" ?! ").iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let embedder = HashingEmbedder::new(16);
        let inputs = vec!["first".to_string(), "second".to_string()];
        let vectors = embedder.embed_batch(&inputs).await.unwrap();
        assert_eq!(vectors[0], embedder.embed_text("first"));
        assert_eq!(vectors[1], embedder.embed_text("second"));
    }
}
