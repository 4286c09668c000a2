//! Error types for the retrieval engine.

use thiserror::Error;

use docqa_corpus::CorpusError;
use docqa_embeddings::EmbeddingError;
use docqa_generation::GenerationError;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Corpus scanning, extraction or chunking error.
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// Embedding, index or cache error.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Generation error.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Search requested before any index was built.
    #[error("no index has been built yet")]
    IndexUnavailable,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking task panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`RetrievalError`] for callers deciding how
/// to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreadable file, directory or persisted store.
    Io,
    DimensionMismatch,
    IndexUnavailable,
    /// Generation failed after all retries.
    GenerationFailure,
    ExtractionFailure,
    /// The embedding capability failed.
    EmbeddingFailure,
    Configuration,
    Internal,
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::Corpus(e) => match e {
                CorpusError::Extraction { .. } => ErrorKind::ExtractionFailure,
                CorpusError::Config(_) => ErrorKind::Configuration,
                _ => ErrorKind::Io,
            },
            RetrievalError::Embedding(e) => match e {
                EmbeddingError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
                EmbeddingError::Io(_)
                | EmbeddingError::Serialization(_)
                | EmbeddingError::Cache(_) => ErrorKind::Io,
                EmbeddingError::Index(_) => ErrorKind::Internal,
                _ => ErrorKind::EmbeddingFailure,
            },
            RetrievalError::Generation(_) => ErrorKind::GenerationFailure,
            RetrievalError::IndexUnavailable => ErrorKind::IndexUnavailable,
            RetrievalError::Config(_) => ErrorKind::Configuration,
            RetrievalError::Task(_) => ErrorKind::Internal,
            RetrievalError::Serialization(_) | RetrievalError::Io(_) => ErrorKind::Io,
        }
    }
}
