//! Deterministic k-means used to train the coarse quantizer of the IVF index.

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::squared_l2;

/// Trained clustering: one centroid per cluster and the cluster of every
/// input point.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub centroids: Vec<Embedding>,
    pub assignments: Vec<usize>,
}

/// Cluster `points` into `k` groups.
///
/// Centroids start at evenly spaced input points so training is
/// reproducible. A cluster that loses all its points keeps its previous
/// centroid. Iteration stops early once assignments are stable.
pub fn train(points: &[Embedding], k: usize, max_iterations: usize) -> Result<KMeans> {
    if k == 0 {
        return Err(EmbeddingError::Index(
            "k-means needs at least one cluster".to_string(),
        ));
    }
    if points.len() < k {
        return Err(EmbeddingError::Index(format!(
            "k-means needs at least {k} points, got {}",
            points.len()
        )));
    }
    let dimension = points[0].len();
    if let Some(bad) = points.iter().find(|p| p.len() != dimension) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }

    let step = points.len() / k;
    let mut centroids: Vec<Embedding> = (0..k).map(|i| points[i * step].clone()).collect();
    let mut assignments = vec![usize::MAX; points.len()];

    for _ in 0..max_iterations.max(1) {
        let mut changed = false;
        for (point, slot) in points.iter().zip(assignments.iter_mut()) {
            let nearest = nearest_centroid(&centroids, point);
            if *slot != nearest {
                *slot = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![vec![0.0f32; dimension]; k];
        let mut counts = vec![0usize; k];
        for (point, &cluster) in points.iter().zip(assignments.iter()) {
            counts[cluster] += 1;
            for (acc, x) in sums[cluster].iter_mut().zip(point.iter()) {
                *acc += x;
            }
        }
        for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
            if count > 0 {
                *centroid = sum.into_iter().map(|x| x / count as f32).collect();
            }
        }
    }

    // The last update may have moved centroids after assignment.
    for (point, slot) in points.iter().zip(assignments.iter_mut()) {
        *slot = nearest_centroid(&centroids, point);
    }

    Ok(KMeans {
        centroids,
        assignments,
    })
}

/// Index of the centroid closest to `point`; ties go to the lower index.
pub fn nearest_centroid(centroids: &[Embedding], point: &[f32]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_l2(centroid, point);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}
