//! Configuration types for corpus scanning and chunking.

use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, Result};

/// Configuration for a corpus directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// File extensions (without the dot, lowercase) that count as documents.
    pub extensions: Vec<String>,

    /// Window size in characters.
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl CorpusConfig {
    /// Create a config with default extensions and window.
    pub fn new() -> Self {
        Self {
            extensions: vec!["pdf".to_string(), "txt".to_string(), "md".to_string()],
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }

    /// Restrict eligible documents to the given extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Set the chunk window.
    pub fn with_window(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Distance between the starts of consecutive chunks.
    pub fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap)
    }

    /// Reject windows that cannot make progress.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CorpusError::Config("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(CorpusError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Check whether a file extension is eligible.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.extensions.iter().any(|e| *e == ext)
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_window() {
        let config = CorpusConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.stride(), 800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_window() {
        let config = CorpusConfig::new().with_window(100, 100);
        assert!(config.validate().is_err());

        let config = CorpusConfig::new().with_window(0, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extensions_are_normalized() {
        let config = CorpusConfig::new().with_extensions([".PDF", "Txt"]);
        assert_eq!(config.extensions, vec!["pdf".to_string(), "txt".to_string()]);
        assert!(config.accepts_extension("PDF"));
        assert!(!config.accepts_extension("md"));
    }
}
