pub mod validation;

/// Positions of the `k` largest scores, highest first. Ties keep their
/// original order and NaN scores sort last.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut indexed_scores: Vec<(usize, f32)> = scores
        .iter()
        .enumerate()
        .map(|(i, &score)| (i, score))
        .collect();

    indexed_scores.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        _ => b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal),
    });

    indexed_scores
        .into_iter()
        .take(k)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_indices() {
        let scores = vec![0.1, 0.5, 0.3, 0.9, 0.2];
        let top_2 = top_k_indices(&scores, 2);
        assert_eq!(top_2, vec![3, 1]);
    }

    #[test]
    fn test_top_k_ties_and_nan() {
        let scores = vec![f32::NAN, 0.5, 0.5, 0.1];
        assert_eq!(top_k_indices(&scores, 10), vec![1, 2, 3, 0]);
        assert!(top_k_indices(&scores, 0).is_empty());
    }
}
