//! # Embeddings
//!
//! Embedding generation, nearest-neighbour search and the semantic query
//! cache.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors with a provider
//! - **Vector Index**: Exact flat search for small corpora, IVF beyond that
//! - **Semantic Cache**: Reuse results for queries whose embeddings are close
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► VectorIndex (flat / IVF)   │
//! │       │                    │                                    │
//! │       ▼                    ▼                                    │
//! │  OpenAI/Hashing      SemanticCache (euclidean threshold)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod index;
pub mod kmeans;
pub mod provider;
pub mod similarity;

pub use cache::{CacheStats, SemanticCache, SemanticCacheConfig};
pub use error::{EmbeddingError, Result};
pub use index::{IndexConfig, IndexKind, SearchHit, VectorIndex};
pub use provider::{EmbeddingProvider, HashingProvider, OpenAIProvider};
pub use similarity::{euclidean_distance, normalize};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
