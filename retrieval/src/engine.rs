//! Retrieval engine implementation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use docqa_corpus::{Chunk, ChunkSet, ChunkStore, CorpusFingerprint};
use docqa_embeddings::{CacheStats, EmbeddingProvider, IndexKind, SemanticCache};
use docqa_generation::{CompletionBackend, GenerationClient};

use crate::config::RagConfig;
use crate::coordinator::{Answer, compose_answer};
use crate::error::{Result, RetrievalError};
use crate::orchestrator::{self, Retrieval};
use crate::snapshot::{CorpusSnapshot, SnapshotStore};

/// Chunks embedded per provider call during a rebuild.
const EMBED_BATCH_SIZE: usize = 100;

/// What a call to [`RagEngine::refresh`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The corpus fingerprint matched the current snapshot.
    Unchanged,

    /// A persisted snapshot for the current corpus was loaded.
    Loaded { chunks: usize, failures: usize },

    /// The corpus was re-extracted, re-embedded and re-indexed.
    Rebuilt { chunks: usize, failures: usize },
}

/// Question answering over a document directory.
///
/// The engine owns the current [`CorpusSnapshot`]. Before a query is served
/// the corpus fingerprint is compared against it and a changed corpus is
/// rebuilt first. A rebuild only replaces the snapshot once it is complete,
/// so readers never see a partial index, and a failed rebuild keeps the
/// previous snapshot.
pub struct RagEngine {
    /// Configuration.
    config: RagConfig,

    /// Scans and chunks the corpus directory.
    store: ChunkStore,

    /// Embeds chunks and queries.
    provider: Arc<dyn EmbeddingProvider>,

    /// Semantic query cache.
    cache: SemanticCache<Vec<Chunk>>,

    /// Generation client.
    generator: GenerationClient,

    /// Persisted snapshot, if configured.
    snapshots: Option<SnapshotStore>,

    /// Snapshot served to queries.
    current: RwLock<Option<Arc<CorpusSnapshot>>>,

    /// Serialises refreshes.
    rebuild: Mutex<()>,
}

impl RagEngine {
    /// Initialize the engine. No corpus work happens until the first
    /// refresh or query.
    pub async fn new(
        config: RagConfig,
        provider: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing retrieval engine for {} with embedder {}",
            config.corpus_dir.display(),
            provider.identity()
        );

        let store = ChunkStore::new(config.corpus.clone())?;
        let cache = SemanticCache::open(config.cache.clone(), provider.identity()).await?;
        let generator = GenerationClient::new(backend, config.generation.clone());
        let snapshots = config.snapshot_path.clone().map(SnapshotStore::new);

        Ok(Self {
            config,
            store,
            provider,
            cache,
            generator,
            snapshots,
            current: RwLock::new(None),
            rebuild: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn generator(&self) -> &GenerationClient {
        &self.generator
    }

    /// The snapshot queries are currently served from.
    pub async fn snapshot(&self) -> Result<Arc<CorpusSnapshot>> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(RetrievalError::IndexUnavailable)
    }

    /// Bring the snapshot in line with the corpus directory.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let _guard = self.rebuild.lock().await;

        let fingerprint = self.compute_fingerprint().await?;
        let identity = self.provider.identity().to_string();
        let previous = self.current.read().await.clone();

        if let Some(current) = &previous {
            if current.is_current(&fingerprint, &identity) {
                debug!("Corpus unchanged ({fingerprint})");
                return Ok(RefreshOutcome::Unchanged);
            }
            info!("Corpus changed, rebuilding index");
        }

        let (snapshot, outcome) = match self.load_persisted(&fingerprint, &identity).await {
            Some(snapshot) => {
                let outcome = RefreshOutcome::Loaded {
                    chunks: snapshot.len(),
                    failures: snapshot.failures.len(),
                };
                (snapshot, outcome)
            }
            None => {
                let snapshot = self.build().await?;
                let outcome = RefreshOutcome::Rebuilt {
                    chunks: snapshot.len(),
                    failures: snapshot.failures.len(),
                };
                (snapshot, outcome)
            }
        };

        // Readers wait until the cache is bound to the new corpus.
        let mut current = self.current.write().await;
        *current = Some(Arc::new(snapshot));
        if self.config.invalidate_cache_on_corpus_change {
            if let Err(err) = self.cache.bind_corpus(fingerprint.as_str()).await {
                warn!("Could not persist semantic cache reset: {err}");
            }
        }
        Ok(outcome)
    }

    async fn compute_fingerprint(&self) -> Result<CorpusFingerprint> {
        let store = self.store.clone();
        let dir = self.config.corpus_dir.clone();
        let fingerprint = tokio::task::spawn_blocking(move || store.fingerprint(&dir)).await??;
        Ok(fingerprint)
    }

    async fn load_persisted(
        &self,
        fingerprint: &CorpusFingerprint,
        identity: &str,
    ) -> Option<CorpusSnapshot> {
        let snapshots = self.snapshots.as_ref()?;
        match snapshots.load(fingerprint, identity).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    "Could not read index snapshot at {}, rebuilding: {err}",
                    snapshots.path().display()
                );
                None
            }
        }
    }

    async fn build(&self) -> Result<CorpusSnapshot> {
        let store = self.store.clone();
        let dir = self.config.corpus_dir.clone();
        let set = tokio::task::spawn_blocking(move || store.build(&dir)).await??;

        let texts = set.texts();
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            embeddings.extend(self.provider.encode(batch).await?);
        }
        debug!("Embedded {} chunks", embeddings.len());

        let ChunkSet {
            chunks,
            fingerprint,
            failures,
            ..
        } = set;
        let identity = self.provider.identity().to_string();
        let dimension = self.provider.dimension();
        let index_config = self.config.index.clone();
        let snapshot = tokio::task::spawn_blocking(move || {
            CorpusSnapshot::build(
                fingerprint,
                identity,
                dimension,
                chunks,
                embeddings,
                failures,
                &index_config,
            )
        })
        .await??;

        if let Some(snapshots) = &self.snapshots {
            if let Err(err) = snapshots.save(&snapshot).await {
                warn!("Could not persist index snapshot: {err}");
            }
        }

        info!(
            "Built {:?} index over {} chunks ({} documents failed extraction)",
            snapshot.index.kind(),
            snapshot.len(),
            snapshot.failures.len()
        );
        Ok(snapshot)
    }

    /// Snapshot to serve a query from, refreshing first when configured.
    async fn ready_snapshot(&self) -> Result<Arc<CorpusSnapshot>> {
        if self.config.refresh_on_query {
            if let Err(err) = self.refresh().await {
                if self.current.read().await.is_none() {
                    return Err(err);
                }
                warn!("Corpus refresh failed, serving previous index: {err}");
            }
        }
        self.snapshot().await
    }

    /// Retrieve the chunks relevant to `query`.
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        let snapshot = self.ready_snapshot().await?;
        orchestrator::retrieve(
            self.provider.as_ref(),
            &self.cache,
            &snapshot,
            query,
            self.config.top_k,
        )
        .await
    }

    /// Answer `query` from the corpus, with source attribution.
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        debug!("Processing query: {query}");
        let snapshot = self.ready_snapshot().await?;
        let retrieval = orchestrator::retrieve(
            self.provider.as_ref(),
            &self.cache,
            &snapshot,
            query,
            self.config.top_k,
        )
        .await?;

        compose_answer(
            &self.generator,
            query,
            &retrieval.chunks,
            &snapshot.source_map,
            retrieval.from_cache,
        )
        .await
    }

    /// Drop every semantic cache entry.
    pub async fn invalidate_cache(&self) -> Result<()> {
        self.cache.invalidate().await?;
        Ok(())
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Get engine statistics.
    pub async fn stats(&self) -> EngineStats {
        let snapshot = self.current.read().await.clone();
        let cache = self.cache.stats().await;
        match snapshot {
            Some(snapshot) => EngineStats {
                chunks: snapshot.len(),
                documents: snapshot
                    .chunks
                    .iter()
                    .map(|c| c.source.as_str())
                    .collect::<std::collections::HashSet<_>>()
                    .len(),
                failed_documents: snapshot.failures.len(),
                index_kind: Some(snapshot.index.kind()),
                clusters: snapshot.index.cluster_total(),
                cached_queries: cache.entries,
                fingerprint: Some(snapshot.fingerprint.clone()),
                built_at: Some(snapshot.built_at),
            },
            None => EngineStats {
                cached_queries: cache.entries,
                ..EngineStats::default()
            },
        }
    }
}

/// Statistics about the retrieval engine.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// Number of chunks indexed.
    pub chunks: usize,

    /// Number of documents with at least one chunk.
    pub documents: usize,

    /// Number of documents that failed extraction.
    pub failed_documents: usize,

    /// Layout of the current index.
    pub index_kind: Option<IndexKind>,

    /// IVF clusters, zero for a flat index.
    pub clusters: usize,

    /// Number of semantic cache entries.
    pub cached_queries: usize,

    /// Fingerprint of the indexed corpus.
    pub fingerprint: Option<CorpusFingerprint>,

    /// When the current index was built.
    pub built_at: Option<DateTime<Utc>>,
}
