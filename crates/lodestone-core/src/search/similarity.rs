//! Vector similarity scoring.

/// Outcome of comparing two vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Similarity {
    /// Cosine similarity of equal-dimension vectors
    Cosine(f32),
    /// Fixed score used when dimensions differ
    Degraded(f32),
}

impl Similarity {
    pub fn value(&self) -> f32 {
        match self {
            Similarity::Cosine(v) | Similarity::Degraded(v) => *v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Similarity::Degraded(_))
    }
}

/// Cosine similarity of two equal-length vectors.
///
/// Returns 0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Scores a stored vector against a query vector.
///
/// Vectors from different embedding spaces usually differ in dimension; they
/// cannot be compared, so they get `degraded_score` when both carry any
/// magnitude and 0 otherwise.
pub fn score(stored: &[f32], query: &[f32], degraded_score: f32) -> Similarity {
    if stored.len() == query.len() {
        return Similarity::Cosine(cosine_similarity(stored, query));
    }
    let has_magnitude = |v: &[f32]| v.iter().map(|x| x.abs()).sum::<f32>() > 0.0;
    if has_magnitude(stored) && has_magnitude(query) {
        Similarity::Degraded(degraded_score)
    } else {
        Similarity::Degraded(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let v = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_degrades() {
        let s = score(&[1.0, 0.0, 0.0], &[0.5, 0.5], 0.1);
        assert_eq!(s, Similarity::Degraded(0.1));
        assert!(s.is_degraded());
    }

    #[test]
    fn test_dimension_mismatch_with_zero_vector() {
        assert_eq!(score(&[0.0, 0.0, 0.0], &[0.5, 0.5], 0.1).value(), 0.0);
        assert_eq!(score(&[1.0], &[0.0, 0.0], 0.1).value(), 0.0);
    }

    #[test]
    fn test_matching_dimensions_use_cosine() {
        let s = score(&[1.0, 1.0], &[1.0, 1.0], 0.1);
        assert!(!s.is_degraded());
        assert!((s.value() - 1.0).abs() < 1e-6);
    }
}
