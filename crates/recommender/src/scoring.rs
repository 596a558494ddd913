//! Affinity scoring over factor vectors.
//!
//! Predictions and recommendations use the raw inner product; similarity
//! queries use cosine similarity over norms that are computed once per
//! matrix generation and cached.

use mf_engine::FactorMatrix;
use std::sync::OnceLock;

/// Dot product over two factor vectors of equal length
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean norm of a factor vector
pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with precomputed norms.
///
/// The denominator is floored at the smallest positive f32 so all-zero
/// vectors score 0.0 instead of dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    inner_product(a, b) / (norm_a * norm_b).max(f32::MIN_POSITIVE)
}

/// Memoized per-row norms for one factor matrix.
///
/// Computed on first use and shared by all readers afterwards; a refit
/// replaces the whole fitted state, cache included, so invalidation is
/// structural rather than explicit.
#[derive(Debug, Default)]
pub struct NormCache {
    norms: OnceLock<Vec<f32>>,
}

impl NormCache {
    pub fn new() -> Self {
        Self {
            norms: OnceLock::new(),
        }
    }

    /// Norms for every row of `matrix`, computing them exactly once
    pub fn get_or_compute(&self, matrix: &FactorMatrix) -> &[f32] {
        self.norms.get_or_init(|| matrix.rows().map(norm).collect())
    }
}
