//! An immutable, fully built view of the corpus: chunks, their sources and
//! the vector index over their embeddings.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use docqa_corpus::{Chunk, ChunkSourceMap, CorpusFingerprint, ExtractionFailure};
use docqa_embeddings::{EmbeddingError, IndexConfig, SearchHit, VectorIndex};

use crate::error::Result;

/// Everything a query needs from one corpus generation.
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    pub fingerprint: CorpusFingerprint,
    pub embedder_identity: String,
    pub chunks: Vec<Chunk>,
    pub source_map: ChunkSourceMap,
    pub index: VectorIndex,
    pub failures: Vec<ExtractionFailure>,
    pub built_at: DateTime<Utc>,
}

impl CorpusSnapshot {
    /// Build the index over already computed chunk embeddings.
    pub fn build(
        fingerprint: CorpusFingerprint,
        embedder_identity: impl Into<String>,
        dimension: usize,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        failures: Vec<ExtractionFailure>,
        config: &IndexConfig,
    ) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(EmbeddingError::Index(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            ))
            .into());
        }
        let index = VectorIndex::build(dimension, embeddings, config)?;
        let source_map = chunks.iter().cloned().collect();
        Ok(Self {
            fingerprint,
            embedder_identity: embedder_identity.into(),
            chunks,
            source_map,
            index,
            failures,
            built_at: Utc::now(),
        })
    }

    /// Whether this snapshot can serve queries for the given corpus state.
    pub fn is_current(&self, fingerprint: &CorpusFingerprint, embedder_identity: &str) -> bool {
        &self.fingerprint == fingerprint && self.embedder_identity == embedder_identity
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Nearest chunks to `query`, `top_k` clamped to the chunk count.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Chunk>> {
        let hits = self.index.search(query, top_k.min(self.chunks.len()))?;
        Ok(hits
            .into_iter()
            .filter_map(|SearchHit { position, .. }| self.chunks.get(position).cloned())
            .collect())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFileRef<'a> {
    fingerprint: &'a CorpusFingerprint,
    embedder_identity: &'a str,
    dimension: usize,
    chunks: &'a [Chunk],
    index: &'a VectorIndex,
    failures: &'a [ExtractionFailure],
    built_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    fingerprint: CorpusFingerprint,
    embedder_identity: String,
    dimension: usize,
    chunks: Vec<Chunk>,
    index: VectorIndex,
    #[serde(default)]
    failures: Vec<ExtractionFailure>,
    built_at: DateTime<Utc>,
}

/// On-disk copy of the latest snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored snapshot if it matches the corpus state.
    ///
    /// Returns `None` when there is no file or it was built for another
    /// fingerprint or embedder.
    pub async fn load(
        &self,
        fingerprint: &CorpusFingerprint,
        embedder_identity: &str,
    ) -> Result<Option<CorpusSnapshot>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: SnapshotFile = serde_json::from_str(&content)?;
        if &file.fingerprint != fingerprint || file.embedder_identity != embedder_identity {
            debug!("Stored snapshot is for another corpus state, ignoring");
            return Ok(None);
        }
        if file.dimension != file.index.dimension() || file.chunks.len() != file.index.len() {
            warn!(
                "Stored snapshot at {} is inconsistent, ignoring",
                self.path.display()
            );
            return Ok(None);
        }
        file.index.validate()?;

        info!("Loaded index snapshot with {} chunks", file.chunks.len());
        let source_map = file.chunks.iter().cloned().collect();
        Ok(Some(CorpusSnapshot {
            fingerprint: file.fingerprint,
            embedder_identity: file.embedder_identity,
            chunks: file.chunks,
            source_map,
            index: file.index,
            failures: file.failures,
            built_at: file.built_at,
        }))
    }

    /// Write the snapshot, replacing any previous one.
    pub async fn save(&self, snapshot: &CorpusSnapshot) -> Result<()> {
        let file = SnapshotFileRef {
            fingerprint: &snapshot.fingerprint,
            embedder_identity: &snapshot.embedder_identity,
            dimension: snapshot.index.dimension(),
            chunks: &snapshot.chunks,
            index: &snapshot.index,
            failures: &snapshot.failures,
            built_at: snapshot.built_at,
        };
        let content = serde_json::to_string(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("Saved index snapshot to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> CorpusSnapshot {
        CorpusSnapshot::build(
            CorpusFingerprint::from_hex("abc"),
            "model",
            2,
            vec![Chunk::new("alpha", "a.txt"), Chunk::new("beta", "b.txt")],
            vec![vec![0.0, 0.0], vec![1.0, 1.0]],
            vec![ExtractionFailure {
                document: "broken.pdf".to_string(),
                path: PathBuf::from("/docs/broken.pdf"),
                message: "no pages".to_string(),
            }],
            &IndexConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_search_maps_positions_to_chunks() {
        let snapshot = sample();
        let chunks = snapshot.search(&[0.9, 0.9], 10).unwrap();
        assert_eq!(
            chunks,
            vec![Chunk::new("beta", "b.txt"), Chunk::new("alpha", "a.txt")]
        );
        assert_eq!(snapshot.source_map.get("alpha"), Some("a.txt"));
    }

    #[test]
    fn test_mismatched_lengths_are_rejected() {
        let result = CorpusSnapshot::build(
            CorpusFingerprint::from_hex("abc"),
            "model",
            2,
            vec![Chunk::new("alpha", "a.txt")],
            Vec::new(),
            Vec::new(),
            &IndexConfig::default(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_store_round_trip_and_staleness() {
        let temp_dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp_dir.path().join("state").join("index.json"));
        let snapshot = sample();

        assert!(
            store
                .load(&snapshot.fingerprint, "model")
                .await
                .unwrap()
                .is_none()
        );
        store.save(&snapshot).await.unwrap();

        let loaded = store
            .load(&snapshot.fingerprint, "model")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.chunks, snapshot.chunks);
        assert_eq!(loaded.failures, snapshot.failures);
        assert_eq!(loaded.built_at, snapshot.built_at);

        let other = CorpusFingerprint::from_hex("def");
        assert!(store.load(&other, "model").await.unwrap().is_none());
        assert!(
            store
                .load(&snapshot.fingerprint, "other-model")
                .await
                .unwrap()
                .is_none()
        );
    }
}
