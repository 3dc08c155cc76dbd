//! Similarity ranking with deterministic tie-breaking
//!
//! Ties always resolve to the earliest candidate in iteration order.

use crate::embedding::cosine_similarity;

/// Index and score of the candidate most similar to `query`
///
/// A later candidate only wins with a strictly greater score. Returns `None`
/// for an empty candidate list.
pub fn best_match<E: AsRef<[f32]>>(query: &[f32], candidates: &[E]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;

    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate.as_ref());
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }

    best
}

/// All candidates as `(index, score)`, best first; equal scores keep iteration order
pub fn rank_by_similarity<E: AsRef<[f32]>>(query: &[f32], candidates: &[E]) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| (idx, cosine_similarity(query, c.as_ref())))
        .collect();

    // Stable sort; cosine_similarity never yields NaN
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_match_picks_highest() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![1.0, 0.1], vec![1.0, 1.0]];

        let (idx, score) = best_match(&query, &candidates).unwrap();
        assert_eq!(idx, 1);
        assert!(score > 0.99);
    }

    #[test]
    fn test_best_match_ties_prefer_first() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![2.0, 0.0], vec![5.0, 0.0]];

        // Candidates 1 and 2 both score exactly 1.0
        assert_eq!(best_match(&query, &candidates).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_best_match_zero_query_picks_first() {
        let query = vec![0.0, 0.0];
        let candidates = vec![vec![0.3, 0.4], vec![1.0, 0.0]];

        assert_eq!(best_match(&query, &candidates), Some((0, 0.0)));
    }

    #[test]
    fn test_best_match_empty() {
        let candidates: Vec<Vec<f32>> = vec![];
        assert_eq!(best_match(&[1.0], &candidates), None);
    }

    #[test]
    fn test_rank_is_stable() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![3.0, 0.0]];

        let ranked: Vec<usize> = rank_by_similarity(&query, &candidates)
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(ranked, vec![1, 2, 0]);
    }
}
