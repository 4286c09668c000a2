//! Distance computation for embeddings.

use crate::error::{EmbeddingError, Result};

/// Ensure two vectors have the same length.
pub fn check_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(EmbeddingError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Squared euclidean distance. Callers must have checked dimensions.
pub(crate) fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Compute the euclidean distance between two embeddings.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimension(a.len(), b.len())?;
    Ok(squared_l2(a, b).sqrt())
}

/// Normalize an embedding to unit length. Zero vectors are left unchanged.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x /= magnitude;
        }
    }
}
