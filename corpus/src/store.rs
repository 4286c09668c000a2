//! Chunk store: the full chunk set for one corpus generation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chunker::{Chunk, FixedWindowSplitter};
use crate::config::CorpusConfig;
use crate::error::{CorpusError, Result};
use crate::extract::{DefaultExtractor, TextExtractor};
use crate::fingerprint::{CorpusFingerprint, fingerprint};
use crate::scan::{document_id, eligible_files};

/// Maps chunk text to the document it was cut from.
///
/// Identical text appearing in several documents resolves to the document
/// visited last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSourceMap {
    sources: HashMap<String, String>,
}

impl ChunkSourceMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the source of a chunk.
    pub fn insert(&mut self, chunk: &Chunk) {
        self.sources.insert(chunk.text.clone(), chunk.source.clone());
    }

    /// Look up the document a chunk text came from.
    pub fn get(&self, text: &str) -> Option<&str> {
        self.sources.get(text).map(String::as_str)
    }

    /// Number of distinct chunk texts.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl FromIterator<Chunk> for ChunkSourceMap {
    fn from_iter<I: IntoIterator<Item = Chunk>>(iter: I) -> Self {
        let mut map = Self::new();
        for chunk in iter {
            map.insert(&chunk);
        }
        map
    }
}

/// A document that could not be extracted during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    /// Document identifier.
    pub document: String,

    /// Full path of the document.
    pub path: PathBuf,

    /// Why extraction failed.
    pub message: String,
}

/// Result of building a chunk store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSet {
    /// Every chunk, documents in file-name order, chunks in text order.
    pub chunks: Vec<Chunk>,

    /// Chunk text to document lookup.
    pub source_map: ChunkSourceMap,

    /// Fingerprint of the corpus the chunks were built from.
    pub fingerprint: CorpusFingerprint,

    /// Documents skipped because their text could not be extracted.
    pub failures: Vec<ExtractionFailure>,
}

impl ChunkSet {
    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if the set holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk texts in order, ready for embedding.
    pub fn texts(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.text.clone()).collect()
    }
}

/// Builds chunk sets from a corpus directory.
#[derive(Clone)]
pub struct ChunkStore {
    config: CorpusConfig,
    splitter: FixedWindowSplitter,
    extractor: Arc<dyn TextExtractor>,
}

impl ChunkStore {
    /// Create a store using the default extractor.
    pub fn new(config: CorpusConfig) -> Result<Self> {
        Self::with_extractor(config, Arc::new(DefaultExtractor::default()))
    }

    /// Create a store with a custom text extractor.
    pub fn with_extractor(config: CorpusConfig, extractor: Arc<dyn TextExtractor>) -> Result<Self> {
        let splitter = FixedWindowSplitter::from_config(&config)?;
        Ok(Self {
            config,
            splitter,
            extractor,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    /// Fingerprint `dir` with this store's eligibility rules.
    pub fn fingerprint(&self, dir: &Path) -> Result<CorpusFingerprint> {
        fingerprint(dir, &self.config)
    }

    /// Read every eligible document in `dir` and build a fresh chunk set.
    ///
    /// A document whose text cannot be extracted is logged and recorded in
    /// [`ChunkSet::failures`]; the rest of the corpus is still chunked. I/O
    /// errors on the directory itself abort the build.
    pub fn build(&self, dir: &Path) -> Result<ChunkSet> {
        let fingerprint = self.fingerprint(dir)?;
        let files = eligible_files(dir, &self.config)?;

        let mut chunks = Vec::new();
        let mut source_map = ChunkSourceMap::new();
        let mut failures = Vec::new();

        for path in &files {
            let document = document_id(path);
            let text = match self.extractor.extract(path) {
                Ok(text) => text,
                Err(CorpusError::Extraction { message, .. }) => {
                    warn!("Skipping {document}: {message}");
                    failures.push(ExtractionFailure {
                        document,
                        path: path.clone(),
                        message,
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let doc_chunks = self.splitter.chunk_with_source(&text, &document);
            debug!("Split {document} into {} chunks", doc_chunks.len());
            for chunk in &doc_chunks {
                source_map.insert(chunk);
            }
            chunks.extend(doc_chunks);
        }

        info!(
            "Total chunks: {} from {} documents ({} failed)",
            chunks.len(),
            files.len() - failures.len(),
            failures.len()
        );
        if let Some(first) = chunks.first() {
            let sample: String = first.text.chars().take(100).collect();
            debug!("Sample chunk: {sample}...");
        }

        Ok(ChunkSet {
            chunks,
            source_map,
            fingerprint,
            failures,
        })
    }
}
