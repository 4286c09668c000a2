//! Fixed-window document chunking.
//!
//! Text is cut into windows of `chunk_size` characters; consecutive windows
//! share `chunk_overlap` characters. Windows start at every multiple of the
//! stride that lies inside the text, so the tail of a document can produce a
//! short chunk that is entirely covered by its predecessor. Lengths are
//! counted in Unicode scalar values, never bytes, so a chunk never splits a
//! character.

use std::iter;

use serde::{Deserialize, Serialize};

use crate::config::CorpusConfig;
use crate::error::Result;

/// A text segment taken from one source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text.
    pub text: String,

    /// Identifier (file name) of the document the chunk came from.
    pub source: String,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Length-based splitter with a fixed window and overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindowSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedWindowSplitter {
    /// Create a splitter, rejecting windows that cannot advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let splitter = Self {
            chunk_size,
            chunk_overlap,
        };
        splitter.as_config().validate()?;
        Ok(splitter)
    }

    /// Create a splitter from a corpus configuration.
    pub fn from_config(config: &CorpusConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Window size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    fn as_config(&self) -> CorpusConfig {
        CorpusConfig::new().with_window(self.chunk_size, self.chunk_overlap)
    }

    /// Split text into overlapping windows. Empty text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        // Byte offset of every character boundary, including the end.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        (0..char_len)
            .step_by(self.stride())
            .map(|start| {
                let end = (start + self.chunk_size).min(char_len);
                text[boundaries[start]..boundaries[end]].to_string()
            })
            .collect()
    }

    /// Split text and tag every piece with its source document.
    pub fn chunk_with_source(&self, text: &str, source: &str) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .map(|piece| Chunk::new(piece, source))
            .collect()
    }
}

impl Default for FixedWindowSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Rejoin chunks by dropping the known overlap from every chunk after the
    /// first.
    fn reassemble(pieces: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, piece) in pieces.iter().enumerate() {
            if i == 0 {
                out.push_str(piece);
            } else {
                out.extend(piece.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_window_positions() {
        let splitter = FixedWindowSplitter::default();
        let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();

        let pieces = splitter.split(&text);
        let lengths: Vec<usize> = pieces.iter().map(|p| p.chars().count()).collect();

        assert_eq!(lengths, vec![1000, 1000, 900, 100]);
        assert_eq!(pieces[1], text[800..1800]);
        assert_eq!(pieces[2], text[1600..2500]);
        assert_eq!(pieces[3], text[2400..2500]);
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = FixedWindowSplitter::default();
        let text = "x".repeat(500);
        assert_eq!(splitter.split(&text), vec![text]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let splitter = FixedWindowSplitter::default();
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn test_reconstruction_after_removing_overlap() {
        let splitter = FixedWindowSplitter::new(7, 3).unwrap();
        let text = "The quick brown fox jumps over the lazy dog, twice.";

        let pieces = splitter.split(text);
        assert_eq!(reassemble(&pieces, 3), text);
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let splitter = FixedWindowSplitter::new(4, 1).unwrap();
        let text = "héllo wörld ✓✓";

        let pieces = splitter.split(text);
        assert!(pieces.iter().all(|p| p.chars().count() <= 4));
        assert_eq!(reassemble(&pieces, 1), text);
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        assert!(FixedWindowSplitter::new(10, 10).is_err());
        assert!(FixedWindowSplitter::new(0, 0).is_err());
    }

    #[test]
    fn test_chunks_carry_source() {
        let splitter = FixedWindowSplitter::new(5, 0).unwrap();
        let chunks = splitter.chunk_with_source("abcdefgh", "memo.txt");

        assert_eq!(
            chunks,
            vec![Chunk::new("abcde", "memo.txt"), Chunk::new("fgh", "memo.txt")]
        );
    }
}
