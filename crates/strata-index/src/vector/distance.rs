//! Similarity and distance functions.
//!
//! Every index ranks with *scores* (higher is better) and filters range
//! queries with *distances* (lower is better). The two are tied per metric:
//!
//! | metric | score            | distance      |
//! |--------|------------------|---------------|
//! | cosine | `cos(a, b)`      | `1 - score`   |
//! | dot    | `a · b`          | `1 - score`   |
//! | l2     | `-‖a - b‖`       | `-score`      |

use super::traits::VectorMetric;
use crate::error::{IndexError, IndexResult};

impl VectorMetric {
    /// Similarity between two vectors (higher is better).
    #[inline]
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            VectorMetric::Cosine => cosine_similarity(a, b),
            VectorMetric::Dot => dot_product(a, b),
            VectorMetric::L2 => -euclidean_distance(a, b), // Negate so higher is better
        }
    }

    /// Distance between two vectors (lower is better).
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        self.score_to_distance(self.score(a, b))
    }

    /// Convert a score into this metric's distance.
    #[inline]
    pub fn score_to_distance(&self, score: f32) -> f32 {
        match self {
            VectorMetric::Cosine | VectorMetric::Dot => 1.0 - score,
            VectorMetric::L2 => -score,
        }
    }

    /// Convert a distance into this metric's score.
    #[inline]
    pub fn distance_to_score(&self, distance: f32) -> f32 {
        match self {
            VectorMetric::Cosine | VectorMetric::Dot => 1.0 - distance,
            VectorMetric::L2 => -distance,
        }
    }
}

/// Reject vectors of the wrong length or with non-finite components.
pub fn validate_vector(expected_dimension: usize, vector: &[f32]) -> IndexResult<()> {
    if vector.len() != expected_dimension {
        return Err(IndexError::DimensionMismatch {
            expected: expected_dimension,
            actual: vector.len(),
        });
    }
    if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
        return Err(IndexError::invalid_vector(format!(
            "non-finite component {} at position {}",
            vector[pos], pos
        )));
    }
    Ok(())
}

/// Reject radii that cannot describe a range query.
pub fn validate_radius(radius: f32) -> IndexResult<()> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(IndexError::invalid_query(format!(
            "radius must be a finite non-negative number, got {}",
            radius
        )));
    }
    Ok(())
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Compute dot product between two vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute Euclidean (L2) distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);

        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
    }

    #[test]
    fn test_dot_product() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![4.0, 5.0, 6.0];
        assert!((dot_product(&a, &b) - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![3.0, 4.0, 0.0];
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_score_distance_roundtrip() {
        for metric in [VectorMetric::Cosine, VectorMetric::Dot, VectorMetric::L2] {
            let d = metric.score_to_distance(0.25);
            assert!((metric.distance_to_score(d) - 0.25).abs() < 1e-6);
        }
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert!((VectorMetric::L2.distance(&a, &b) - 5.0).abs() < 1e-6);
        assert!((VectorMetric::L2.score(&a, &b) + 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_validate_vector() {
        assert!(validate_vector(3, &[1.0, 2.0, 3.0]).is_ok());
        assert!(matches!(
            validate_vector(3, &[1.0, 2.0]),
            Err(IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            validate_vector(2, &[1.0, f32::NAN]),
            Err(IndexError::InvalidVector { .. })
        ));
    }

    #[test]
    fn test_validate_radius() {
        assert!(validate_radius(0.0).is_ok());
        assert!(validate_radius(-1.0).is_err());
        assert!(validate_radius(f32::INFINITY).is_err());
    }
}
