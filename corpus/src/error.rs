//! Error types for corpus scanning and chunking.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Errors that can occur while reading or chunking a corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Corpus directory does not exist.
    #[error("corpus directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// A document could not be turned into text.
    #[error("failed to extract text from {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    /// Splitter or scanner configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl CorpusError {
    /// Build an extraction error for `path`.
    pub fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from local I/O rather than document content.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotFound(_) | Self::Io(_) | Self::Walk(_)
        )
    }
}
