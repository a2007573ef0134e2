use std::cmp::Ordering;

use super::StoreError;

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, StoreError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(StoreError::InvalidArgument(
            "Vectors must not be empty".to_string(),
        ));
    }
    if query.len() != candidate.len() {
        return Err(StoreError::DimensionMismatch {
            expected: candidate.len(),
            actual: query.len(),
        });
    }

    let dot: f32 = query.iter().zip(candidate).map(|(x, y)| x * y).sum();
    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / denom)
}

/// Scores every candidate; highest first, ties keep candidate order.
pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<(usize, f32)>, StoreError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    Ok(scores)
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}
