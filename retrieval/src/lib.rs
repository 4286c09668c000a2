//! # Retrieval Engine
//!
//! Retrieval-augmented question answering over a directory of documents:
//!
//! - **Corpus**: fingerprinting, extraction and chunking
//! - **Embeddings**: vector index and semantic query cache
//! - **Generation**: prompt completion with bounded retries
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        RagEngine                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  fingerprint ──changed──► ChunkStore ──► embed ──► VectorIndex  │
//! │       │                                               │         │
//! │       └────────────► CorpusSnapshot (swap) ◄──────────┘         │
//! │                              │                                  │
//! │  query ──► embed ──► SemanticCache ──miss──► search             │
//! │                              │                                  │
//! │                              ▼                                  │
//! │              prompt ──► GenerationClient ──► Answer + sources   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use docqa_embeddings::OpenAIProvider;
//! use docqa_generation::{GeminiBackend, GeminiConfig};
//! use docqa_retrieval::{RagConfig, RagEngine};
//!
//! let config = RagConfig::load("docqa.toml")?;
//! let engine = RagEngine::new(
//!     config,
//!     Arc::new(OpenAIProvider::new()),
//!     Arc::new(GeminiBackend::new(GeminiConfig::from_env())),
//! )
//! .await?;
//!
//! let answer = engine.answer("Who was employee of the month?").await?;
//! ```

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod snapshot;

pub use config::RagConfig;
pub use coordinator::{Answer, UNKNOWN_SOURCE, attribute_sources, build_prompt};
pub use engine::{EngineStats, RagEngine, RefreshOutcome};
pub use error::{ErrorKind, Result, RetrievalError};
pub use orchestrator::Retrieval;
pub use snapshot::{CorpusSnapshot, SnapshotStore};

// Re-export from dependencies for convenience
pub use docqa_corpus::{Chunk, ChunkSourceMap, CorpusConfig};
pub use docqa_embeddings::{EmbeddingProvider, IndexConfig, SemanticCacheConfig};
pub use docqa_generation::{CompletionBackend, GenerationConfig};
