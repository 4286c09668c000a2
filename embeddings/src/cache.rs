//! Semantic query cache.
//!
//! Entries are matched by embedding distance rather than exact text: a
//! lookup returns the response of the first stored query whose embedding is
//! closer than `threshold` to the probe. Insertion order decides precedence.
//!
//! The cache belongs to one embedder identity. When the file on disk was
//! written under another identity it is discarded on open. It can also be
//! bound to a corpus fingerprint, in which case binding it to a different
//! corpus drops every entry. With a backing path, every insert rewrites the
//! whole file.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::squared_l2;

/// Semantic cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticCacheConfig {
    /// Euclidean distance below which two queries are treated as the same.
    pub threshold: f32,

    /// Oldest entries are dropped beyond this many. `None` never evicts.
    pub max_entries: Option<usize>,

    /// Backing file. `None` keeps the cache in memory only.
    pub path: Option<PathBuf>,
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_entries: None,
            path: None,
        }
    }
}

impl SemanticCacheConfig {
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }
}

#[derive(Debug)]
struct Entries<T> {
    queries: Vec<String>,
    embeddings: Vec<Embedding>,
    responses: Vec<T>,
    corpus: Option<String>,
}

impl<T> Entries<T> {
    fn empty() -> Self {
        Self {
            queries: Vec::new(),
            embeddings: Vec::new(),
            responses: Vec::new(),
            corpus: None,
        }
    }

    fn clear(&mut self) {
        self.queries.clear();
        self.embeddings.clear();
        self.responses.clear();
    }

    fn evict_front(&mut self, count: usize) {
        self.queries.drain(..count);
        self.embeddings.drain(..count);
        self.responses.drain(..count);
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile<T> {
    queries: Vec<String>,
    embeddings: Vec<Embedding>,
    responses: Vec<T>,
    embedder_identity: String,
    #[serde(default)]
    corpus_fingerprint: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheFileRef<'a, T> {
    queries: &'a [String],
    embeddings: &'a [Embedding],
    responses: &'a [T],
    embedder_identity: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    corpus_fingerprint: Option<&'a str>,
}

/// Statistics about the semantic cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Embedder identity the entries were computed with.
    pub embedder_identity: String,

    /// Maximum cache size, if bounded.
    pub max_entries: Option<usize>,
}

/// Approximate-match cache from query embeddings to responses.
pub struct SemanticCache<T> {
    config: SemanticCacheConfig,
    identity: String,
    entries: Mutex<Entries<T>>,
}

impl<T> SemanticCache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Create a cache that is never written to disk.
    pub fn in_memory(config: SemanticCacheConfig, identity: impl Into<String>) -> Self {
        Self {
            config: SemanticCacheConfig {
                path: None,
                ..config
            },
            identity: identity.into(),
            entries: Mutex::new(Entries::empty()),
        }
    }

    /// Open the cache, loading the backing file if one exists.
    ///
    /// A missing file yields an empty cache. A file written under another
    /// embedder identity is discarded. A malformed file is an error.
    pub async fn open(config: SemanticCacheConfig, identity: impl Into<String>) -> Result<Self> {
        let identity = identity.into();
        let entries = match &config.path {
            Some(path) => Self::load(path, &identity).await?,
            None => Entries::empty(),
        };
        Ok(Self {
            config,
            identity,
            entries: Mutex::new(entries),
        })
    }

    async fn load(path: &Path, identity: &str) -> Result<Entries<T>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No semantic cache at {}", path.display());
                return Ok(Entries::empty());
            }
            Err(e) => return Err(e.into()),
        };

        let file: CacheFile<T> = serde_json::from_str(&content)?;
        if file.embedder_identity != identity {
            info!(
                "Semantic cache was built with {}, active embedder is {identity}; starting empty",
                file.embedder_identity
            );
            return Ok(Entries::empty());
        }
        if file.queries.len() != file.embeddings.len() || file.queries.len() != file.responses.len()
        {
            return Err(EmbeddingError::Cache(format!(
                "{} has {} queries, {} embeddings and {} responses",
                path.display(),
                file.queries.len(),
                file.embeddings.len(),
                file.responses.len()
            )));
        }

        info!("Loaded {} semantic cache entries", file.queries.len());
        Ok(Entries {
            queries: file.queries,
            embeddings: file.embeddings,
            responses: file.responses,
            corpus: file.corpus_fingerprint,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &SemanticCacheConfig {
        &self.config
    }

    /// Return the response of the first entry closer than the threshold.
    /// Entries with a different dimension are skipped.
    pub async fn lookup(&self, embedding: &[f32]) -> Option<T> {
        let threshold_sq = self.config.threshold * self.config.threshold;
        let entries = self.entries.lock().await;
        for (i, cached) in entries.embeddings.iter().enumerate() {
            if cached.len() != embedding.len() {
                warn!(
                    "Skipping cache entry with dimension {} (query has {})",
                    cached.len(),
                    embedding.len()
                );
                continue;
            }
            if squared_l2(cached, embedding) < threshold_sq {
                debug!("Semantic cache hit on \"{}\"", entries.queries[i]);
                return Some(entries.responses[i].clone());
            }
        }
        None
    }

    /// Append an entry and persist the whole cache.
    ///
    /// The new state is written before it replaces the in-memory entries, so
    /// a failed write leaves the cache as it was.
    pub async fn insert(&self, query: impl Into<String>, embedding: Embedding, response: T) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let mut staged = Entries {
            queries: entries.queries.clone(),
            embeddings: entries.embeddings.clone(),
            responses: entries.responses.clone(),
            corpus: entries.corpus.clone(),
        };
        staged.queries.push(query.into());
        staged.embeddings.push(embedding);
        staged.responses.push(response);

        if let Some(max) = self.config.max_entries {
            let excess = staged.queries.len().saturating_sub(max);
            if excess > 0 {
                staged.evict_front(excess);
                debug!("Evicted {excess} semantic cache entries");
            }
        }

        self.persist(&staged).await?;
        *entries = staged;
        Ok(())
    }

    /// Drop every entry, including the persisted copy.
    pub async fn invalidate(&self) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.clear();
        info!("Invalidated semantic cache");
        self.persist(&entries).await
    }

    /// Corpus fingerprint the entries were computed for, if bound.
    pub async fn corpus(&self) -> Option<String> {
        self.entries.lock().await.corpus.clone()
    }

    /// Bind the cache to `corpus`, dropping every entry when it was bound to
    /// another corpus or to none. Returns whether the binding changed.
    ///
    /// Memory is cleared even when the write fails; the error is returned.
    pub async fn bind_corpus(&self, corpus: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        if entries.corpus.as_deref() == Some(corpus) {
            return Ok(false);
        }
        let dropped = entries.queries.len();
        entries.clear();
        entries.corpus = Some(corpus.to_string());
        info!("Semantic cache bound to corpus {corpus}, dropped {dropped} entries");
        self.persist(&entries).await?;
        Ok(true)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.queries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            embedder_identity: self.identity.clone(),
            max_entries: self.config.max_entries,
        }
    }

    async fn persist(&self, entries: &Entries<T>) -> Result<()> {
        let Some(path) = &self.config.path else {
            return Ok(());
        };

        let file = CacheFileRef {
            queries: &entries.queries,
            embeddings: &entries.embeddings,
            responses: &entries.responses,
            embedder_identity: &self.identity,
            corpus_fingerprint: entries.corpus.as_deref(),
        };
        let content = serde_json::to_string(&file)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await?;

        debug!("Saved {} semantic cache entries", entries.queries.len());
        Ok(())
    }
}
