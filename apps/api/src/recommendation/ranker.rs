//! Similarity Ranking — orders candidates by cosine similarity to the job.
//!
//! Vectors arrive L2-normalized from the embedding layer, so cosine reduces
//! to a dot product. Scores are clamped to [-1, 1] to absorb floating-point
//! drift and sorted with a stable sort so equal scores keep submission order.

/// Dot product of two normalized vectors, clamped to the cosine range.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot.clamp(-1.0, 1.0)
}

/// Scores every candidate vector against the job vector and returns
/// `(original_index, score)` pairs, best first, truncated to `top_k`.
/// A `top_k` larger than the candidate count returns everything.
pub fn rank(
    job_vector: &[f32],
    candidate_vectors: &[Vec<f32>],
    top_k: usize,
) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidate_vectors
        .iter()
        .enumerate()
        .map(|(index, vector)| (index, cosine_similarity(job_vector, vector)))
        .collect();

    // Stable: ties keep ascending original index.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors_score_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_drift_is_clamped() {
        // Slightly over-unit vectors must not escape the cosine range.
        let a = vec![1.000001, 0.0];
        assert_eq!(cosine_similarity(&a, &a), 1.0);
        let b = vec![-1.000001, 0.0];
        assert_eq!(cosine_similarity(&a, &b), -1.0);
    }

    #[test]
    fn test_rank_sorts_descending() {
        let job = vec![1.0, 0.0];
        let candidates = vec![
            vec![0.0, 1.0],  // 0.0
            vec![1.0, 0.0],  // 1.0
            vec![0.6, 0.8],  // 0.6
        ];
        let ranked = rank(&job, &candidates, 10);
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_ties_keep_submission_order() {
        let job = vec![1.0, 0.0];
        let candidates = vec![
            vec![0.6, 0.8],
            vec![0.6, -0.8], // same dot product as index 0
            vec![0.6, 0.8],
        ];
        let ranked = rank(&job, &candidates, 10);
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_top_k_truncates() {
        let job = vec![1.0, 0.0];
        let candidates = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8]];
        assert_eq!(rank(&job, &candidates, 2).len(), 2);
    }

    #[test]
    fn test_top_k_beyond_count_returns_all() {
        let job = vec![1.0, 0.0];
        let candidates = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(rank(&job, &candidates, 50).len(), 2);
    }

    #[test]
    fn test_empty_candidates_rank_empty() {
        assert!(rank(&[1.0, 0.0], &[], 5).is_empty());
    }
}
