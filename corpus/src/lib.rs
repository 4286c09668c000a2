//! # Corpus
//!
//! Scanning, fingerprinting, text extraction and chunking for a directory of
//! source documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Corpus                                  │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  directory ──► eligible_files ──► fingerprint (SHA-256)         │
//! │                      │                                          │
//! │                      ▼                                          │
//! │               TextExtractor ──► FixedWindowSplitter ──► ChunkSet │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod chunker;
pub mod config;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod scan;
pub mod store;

pub use chunker::{Chunk, FixedWindowSplitter};
pub use config::CorpusConfig;
pub use error::{CorpusError, Result};
pub use extract::{DefaultExtractor, PdfExtractor, PlainTextExtractor, TextExtractor};
pub use fingerprint::{CorpusFingerprint, fingerprint};
pub use scan::{document_id, eligible_files};
pub use store::{ChunkSet, ChunkSourceMap, ChunkStore, ExtractionFailure};
