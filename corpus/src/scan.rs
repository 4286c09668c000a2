//! Enumeration of eligible documents in a corpus directory.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::{CorpusError, Result};

/// List eligible documents directly inside `dir`, sorted by file name.
///
/// Subdirectories are not descended into. The order is lexicographic on the
/// raw file name so that every consumer (fingerprinting, chunking) sees the
/// same sequence.
pub fn eligible_files(dir: &Path, config: &CorpusConfig) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CorpusError::DirectoryNotFound(dir.to_path_buf()));
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let eligible = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| config.accepts_extension(e));
        if eligible {
            files.push(entry.into_path());
        }
    }

    debug!("Found {} eligible documents in {}", files.len(), dir.display());
    Ok(files)
}

/// Stable document identifier for a path: its file name.
pub fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
