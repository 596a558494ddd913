//! Evaluation metrics.

use crate::error::{RecommendError, Result};

/// Root-mean-square error between two equal-length sequences.
///
/// Empty (equal-length) inputs yield 0.0.
pub fn rmse(actual: &[f32], expected: &[f32]) -> Result<f32> {
    if actual.len() != expected.len() {
        return Err(RecommendError::SizeMismatch {
            actual: actual.len(),
            expected: expected.len(),
        });
    }
    if actual.is_empty() {
        return Ok(0.0);
    }

    let sum: f64 = actual
        .iter()
        .zip(expected)
        .map(|(a, e)| ((a - e) as f64).powi(2))
        .sum();
    Ok((sum / actual.len() as f64).sqrt() as f32)
}
