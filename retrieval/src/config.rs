//! Configuration for the retrieval engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use docqa_corpus::CorpusConfig;
use docqa_embeddings::{IndexConfig, SemanticCacheConfig};
use docqa_generation::GenerationConfig;

use crate::error::{Result, RetrievalError};

/// File name of the persisted semantic cache inside a state directory.
pub const CACHE_FILE_NAME: &str = "semantic_cache.json";

/// File name of the persisted index snapshot inside a state directory.
pub const SNAPSHOT_FILE_NAME: &str = "index_snapshot.json";

/// Configuration for the retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Directory holding the source documents.
    pub corpus_dir: PathBuf,

    /// Scanning and chunking.
    pub corpus: CorpusConfig,

    /// Vector index layout.
    pub index: IndexConfig,

    /// Semantic query cache.
    pub cache: SemanticCacheConfig,

    /// Generation model and retry policy.
    pub generation: GenerationConfig,

    /// Number of chunks retrieved per query.
    pub top_k: usize,

    /// Check the corpus fingerprint before every query.
    pub refresh_on_query: bool,

    /// Clear the semantic cache whenever the corpus changes, including
    /// changes made while the engine was stopped.
    pub invalidate_cache_on_corpus_change: bool,

    /// Where the built index is persisted. `None` rebuilds on every start.
    pub snapshot_path: Option<PathBuf>,
}

impl RagConfig {
    /// Create a new configuration with default values.
    pub fn new(corpus_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
            corpus: CorpusConfig::default(),
            index: IndexConfig::default(),
            cache: SemanticCacheConfig::default(),
            generation: GenerationConfig::default(),
            top_k: 10,
            refresh_on_query: true,
            invalidate_cache_on_corpus_change: false,
            snapshot_path: None,
        }
    }

    /// Load a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RetrievalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.corpus.validate()?;
        if self.cache.threshold.is_nan() || self.cache.threshold <= 0.0 {
            return Err(RetrievalError::Config(format!(
                "cache threshold must be positive, got {}",
                self.cache.threshold
            )));
        }
        Ok(())
    }

    /// Persist the semantic cache and index snapshot under `dir`.
    pub fn with_state_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.cache.path = Some(dir.join(CACHE_FILE_NAME));
        self.snapshot_path = Some(dir.join(SNAPSHOT_FILE_NAME));
        self
    }

    pub fn with_corpus(mut self, corpus: CorpusConfig) -> Self {
        self.corpus = corpus;
        self
    }

    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    pub fn with_cache(mut self, cache: SemanticCacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_refresh_on_query(mut self, enabled: bool) -> Self {
        self.refresh_on_query = enabled;
        self
    }

    pub fn with_cache_invalidation_on_change(mut self, enabled: bool) -> Self {
        self.invalidate_cache_on_corpus_change = enabled;
        self
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_default().join("docqa");
        Self::new(data_dir.join("documents")).with_state_dir(data_dir)
    }
}
