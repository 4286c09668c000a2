//! Integration tests for building chunk sets from a corpus directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use docqa_corpus::{
    Chunk, ChunkStore, CorpusConfig, CorpusError, PlainTextExtractor, TextExtractor,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_doc(dir: &Path, name: &str, len: usize) {
    let text: String = (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    fs::write(dir.join(name), text).unwrap();
}

#[test]
fn test_two_document_scenario() {
    let temp_dir = TempDir::new().unwrap();
    write_doc(temp_dir.path(), "long.txt", 2500);
    write_doc(temp_dir.path(), "short.txt", 500);

    let store = ChunkStore::new(CorpusConfig::default().with_window(1000, 200)).unwrap();
    let set = store.build(temp_dir.path()).unwrap();

    assert_eq!(set.len(), 5);
    let per_doc: Vec<(&str, usize)> = set
        .chunks
        .iter()
        .map(|c| (c.source.as_str(), c.char_len()))
        .collect();
    assert_eq!(
        per_doc,
        vec![
            ("long.txt", 1000),
            ("long.txt", 1000),
            ("long.txt", 900),
            ("long.txt", 100),
            ("short.txt", 500),
        ]
    );
}

#[test]
fn test_every_chunk_maps_to_its_document() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("sales.txt"), "Back-to-School Bonanza is live.").unwrap();
    fs::write(temp_dir.path().join("it.md"), "UltraFiber 2.0 launches next month.").unwrap();

    let store = ChunkStore::new(CorpusConfig::default()).unwrap();
    let set = store.build(temp_dir.path()).unwrap();

    for chunk in &set.chunks {
        assert_eq!(set.source_map.get(&chunk.text), Some(chunk.source.as_str()));
    }
}

#[test]
fn test_rebuild_is_total_and_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    write_doc(temp_dir.path(), "a.txt", 1200);

    let store = ChunkStore::new(CorpusConfig::default()).unwrap();
    let first = store.build(temp_dir.path()).unwrap();
    let second = store.build(temp_dir.path()).unwrap();
    assert_eq!(first.chunks, second.chunks);
    assert_eq!(first.fingerprint, second.fingerprint);

    fs::remove_file(temp_dir.path().join("a.txt")).unwrap();
    write_doc(temp_dir.path(), "b.txt", 10);
    let third = store.build(temp_dir.path()).unwrap();

    assert_ne!(third.fingerprint, first.fingerprint);
    assert!(third.chunks.iter().all(|c| c.source == "b.txt"));
    assert!(third.source_map.get(&first.chunks[0].text).is_none());
}

#[test]
fn test_missing_directory_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = ChunkStore::new(CorpusConfig::default()).unwrap();

    let err = store.build(&temp_dir.path().join("gone")).unwrap_err();
    assert!(err.is_io());
}

struct UppercaseExtractor;

impl TextExtractor for UppercaseExtractor {
    fn name(&self) -> &str {
        "uppercase"
    }

    fn extract(&self, path: &Path) -> docqa_corpus::Result<String> {
        if path.ends_with("corrupt.txt") {
            return Err(CorpusError::extraction(path, "checksum mismatch"));
        }
        Ok(PlainTextExtractor.extract(path)?.to_uppercase())
    }
}

#[test]
fn test_custom_extractor_and_failure_report() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("corrupt.txt"), "ignored").unwrap();
    fs::write(temp_dir.path().join("memo.txt"), "employee of the month").unwrap();

    let store =
        ChunkStore::with_extractor(CorpusConfig::default(), Arc::new(UppercaseExtractor)).unwrap();
    let set = store.build(temp_dir.path()).unwrap();

    assert_eq!(set.chunks, vec![Chunk::new("EMPLOYEE OF THE MONTH", "memo.txt")]);
    assert_eq!(set.failures.len(), 1);
    assert_eq!(set.failures[0].message, "checksum mismatch");
}
