//! Nearest-neighbour index over chunk embeddings.
//!
//! Small corpora get an exact flat index. Once the corpus reaches
//! `flat_threshold` vectors an inverted-file (IVF) index is trained instead:
//! k-means partitions the vectors into `min(floor(sqrt(n)), max_clusters)`
//! lists and a query only scans the lists of its nearest centroids.

use std::collections::HashSet;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::kmeans;
use crate::similarity::{check_dimension, squared_l2};

/// Index build settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Vector count at which the IVF layout is used.
    pub flat_threshold: usize,

    /// Upper bound on the number of IVF clusters.
    pub max_clusters: usize,

    /// Number of nearest clusters scanned per query.
    pub nprobe: usize,

    /// k-means iterations when training the IVF quantizer.
    pub kmeans_iterations: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            flat_threshold: 100,
            max_clusters: 100,
            nprobe: 1,
            kmeans_iterations: 25,
        }
    }
}

impl IndexConfig {
    /// Set the number of clusters probed per query.
    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = nprobe;
        self
    }

    /// Set the flat/IVF switch-over point.
    pub fn with_flat_threshold(mut self, threshold: usize) -> Self {
        self.flat_threshold = threshold;
        self
    }

    /// Number of clusters an IVF index over `n` vectors is trained with.
    pub fn cluster_count(&self, n: usize) -> usize {
        let root = (n as f64).sqrt().floor() as usize;
        root.min(self.max_clusters).max(1)
    }
}

/// Which layout an index uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Flat,
    Ivf,
}

/// One search result: the position of the vector in build order and its
/// euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Layout {
    Flat,
    Ivf {
        centroids: Vec<Embedding>,
        lists: Vec<Vec<usize>>,
    },
}

/// A built, immutable vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<Embedding>,
    layout: Layout,
    nprobe: usize,
}

impl VectorIndex {
    /// Build an index over `embeddings`. Positions in search results refer
    /// to the order of this vector.
    pub fn build(dimension: usize, embeddings: Vec<Embedding>, config: &IndexConfig) -> Result<Self> {
        for embedding in &embeddings {
            check_dimension(dimension, embedding.len())?;
        }

        let n = embeddings.len();
        let layout = if n < config.flat_threshold.max(1) {
            Layout::Flat
        } else {
            let k = config.cluster_count(n);
            let model = kmeans::train(&embeddings, k, config.kmeans_iterations)?;
            let mut lists = vec![Vec::new(); k];
            for (position, cluster) in model.assignments.into_iter().enumerate() {
                lists[cluster].push(position);
            }
            Layout::Ivf {
                centroids: model.centroids,
                lists,
            }
        };

        let index = Self {
            dimension,
            vectors: embeddings,
            layout,
            nprobe: config.nprobe.max(1),
        };
        info!(
            "Built {:?} index over {n} vectors ({} clusters)",
            index.kind(),
            index.cluster_total()
        );
        Ok(index)
    }

    /// Layout in use.
    pub fn kind(&self) -> IndexKind {
        match self.layout {
            Layout::Flat => IndexKind::Flat,
            Layout::Ivf { .. } => IndexKind::Ivf,
        }
    }

    /// Number of IVF clusters, zero for a flat index.
    pub fn cluster_total(&self) -> usize {
        match &self.layout {
            Layout::Flat => 0,
            Layout::Ivf { centroids, .. } => centroids.len(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Return up to `k` nearest vectors in ascending distance order. `k` is
    /// clamped to the index size; equal distances are ordered by position.
    ///
    /// An IVF index keeps probing further clusters, nearest first, until it
    /// has at least `k` candidates, so it never pads results with missing
    /// entries.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        check_dimension(self.dimension, query.len())?;
        let k = k.min(self.vectors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(OrderedFloat<f32>, usize)> = match &self.layout {
            Layout::Flat => self
                .vectors
                .iter()
                .enumerate()
                .map(|(position, v)| (OrderedFloat(squared_l2(v, query)), position))
                .collect(),
            Layout::Ivf { centroids, lists } => {
                let mut order: Vec<(OrderedFloat<f32>, usize)> = centroids
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (OrderedFloat(squared_l2(c, query)), i))
                    .collect();
                order.sort();

                let mut candidates = Vec::new();
                for (probed, (_, cluster)) in order.into_iter().enumerate() {
                    if probed >= self.nprobe && candidates.len() >= k {
                        break;
                    }
                    candidates.extend(lists[cluster].iter().map(|&position| {
                        (OrderedFloat(squared_l2(&self.vectors[position], query)), position)
                    }));
                }
                debug!("IVF search scanned {} candidates", candidates.len());
                candidates
            }
        };

        hits.sort();
        Ok(hits
            .into_iter()
            .take(k)
            .map(|(distance, position)| SearchHit {
                position,
                distance: distance.into_inner().sqrt(),
            })
            .collect())
    }

    /// Check the internal consistency of an index loaded from disk.
    pub fn validate(&self) -> Result<()> {
        for vector in &self.vectors {
            check_dimension(self.dimension, vector.len())?;
        }
        if let Layout::Ivf { centroids, lists } = &self.layout {
            if centroids.len() != lists.len() || centroids.is_empty() {
                return Err(EmbeddingError::Index(format!(
                    "{} centroids for {} inverted lists",
                    centroids.len(),
                    lists.len()
                )));
            }
            for centroid in centroids {
                check_dimension(self.dimension, centroid.len())?;
            }
            let mut seen = HashSet::new();
            for &position in lists.iter().flatten() {
                if position >= self.vectors.len() || !seen.insert(position) {
                    return Err(EmbeddingError::Index(format!(
                        "inverted list entry {position} is out of range or repeated"
                    )));
                }
            }
            if seen.len() != self.vectors.len() {
                return Err(EmbeddingError::Index(
                    "inverted lists do not cover every vector".to_string(),
                ));
            }
        }
        Ok(())
    }
}
