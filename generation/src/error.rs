//! Error types for text generation.

use thiserror::Error;

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors that can occur while generating text.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Backend is missing credentials or a project.
    #[error("generation backend not configured: {0}")]
    NotConfigured(String),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered with something we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Every attempt failed.
    #[error("generation failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<GenerationError>,
    },

    /// The caller cancelled while waiting to retry.
    #[error("generation cancelled")]
    Cancelled,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GenerationError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            GenerationError::NotConfigured(_)
                | GenerationError::Cancelled
                | GenerationError::Exhausted { .. }
        )
    }
}
