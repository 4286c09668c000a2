//! Content fingerprints for change detection.
//!
//! A fingerprint is a SHA-256 digest folded over every eligible document,
//! visited in file-name order. Each document contributes its id and byte
//! length ahead of its content, so renames and bytes moving between files
//! change the digest. Files are streamed in fixed-size blocks so memory use
//! does not depend on document size.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::CorpusConfig;
use crate::error::Result;
use crate::scan::{document_id, eligible_files};

/// Size of each read when streaming a document into the digest.
pub const READ_BLOCK_SIZE: usize = 4096;

/// Digest summarizing the current content of a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorpusFingerprint(String);

impl CorpusFingerprint {
    /// Wrap an existing hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Hex representation of the digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorpusFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of the eligible documents in `dir`.
pub fn fingerprint(dir: &Path, config: &CorpusConfig) -> Result<CorpusFingerprint> {
    let files = eligible_files(dir, config)?;
    let mut hasher = Sha256::new();
    let mut block = [0u8; READ_BLOCK_SIZE];

    for path in &files {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        hasher.update(document_id(path).as_bytes());
        hasher.update([0u8]);
        hasher.update(length.to_le_bytes());

        let mut reader = BufReader::new(file);
        loop {
            let read = reader.read(&mut block)?;
            if read == 0 {
                break;
            }
            hasher.update(&block[..read]);
        }
    }

    let digest = CorpusFingerprint(format!("{:x}", hasher.finalize()));
    debug!("Fingerprinted {} documents: {digest}", files.len());
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("one.txt"), "alpha").unwrap();
        fs::write(temp_dir.path().join("two.txt"), "beta").unwrap();
        let config = CorpusConfig::default();

        let first = fingerprint(temp_dir.path(), &config).unwrap();
        let second = fingerprint(temp_dir.path(), &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
    }

    #[test]
    fn test_single_byte_change_changes_fingerprint() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("one.txt"), "alpha").unwrap();
        let config = CorpusConfig::default();
        let before = fingerprint(temp_dir.path(), &config).unwrap();

        fs::write(temp_dir.path().join("one.txt"), "alphb").unwrap();
        let after = fingerprint(temp_dir.path(), &config).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_large_file_streams_in_blocks() {
        let temp_dir = TempDir::new().unwrap();
        let big = "x".repeat(READ_BLOCK_SIZE * 3 + 17);
        fs::write(temp_dir.path().join("big.txt"), &big).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"big.txt\0");
        hasher.update((big.len() as u64).to_le_bytes());
        hasher.update(big.as_bytes());
        let expected = format!("{:x}", hasher.finalize());

        let digest = fingerprint(temp_dir.path(), &CorpusConfig::default()).unwrap();
        assert_eq!(digest.as_str(), expected);
    }

    #[test]
    fn test_rename_changes_fingerprint() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("old.txt"), "alpha").unwrap();
        let config = CorpusConfig::default();
        let before = fingerprint(temp_dir.path(), &config).unwrap();

        fs::rename(temp_dir.path().join("old.txt"), temp_dir.path().join("new.txt")).unwrap();
        let after = fingerprint(temp_dir.path(), &config).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_bytes_moving_across_files_changes_fingerprint() {
        let first = TempDir::new().unwrap();
        fs::write(first.path().join("a.txt"), "ab").unwrap();
        fs::write(first.path().join("b.txt"), "c").unwrap();

        let second = TempDir::new().unwrap();
        fs::write(second.path().join("a.txt"), "a").unwrap();
        fs::write(second.path().join("b.txt"), "bc").unwrap();

        let config = CorpusConfig::default();
        assert_ne!(
            fingerprint(first.path(), &config).unwrap(),
            fingerprint(second.path(), &config).unwrap()
        );
    }

    #[test]
    fn test_ineligible_files_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("one.txt"), "alpha").unwrap();
        let config = CorpusConfig::default();
        let before = fingerprint(temp_dir.path(), &config).unwrap();

        fs::write(temp_dir.path().join("image.png"), "binary").unwrap();
        let after = fingerprint(temp_dir.path(), &config).unwrap();
        assert_eq!(before, after);
    }
}
