//! Text extraction from source documents.
//!
//! Extraction is pluggable through [`TextExtractor`]. Extractors never modify
//! the document and report corrupt input as [`CorpusError::Extraction`]
//! rather than returning empty text.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{CorpusError, Result};

/// Produces plain text for one source document.
pub trait TextExtractor: Send + Sync {
    /// Get the name of this extractor.
    fn name(&self) -> &str;

    /// Extract the text of the document at `path`.
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Reads UTF-8 text files verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain-text"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| CorpusError::extraction(path, format!("not valid UTF-8: {e}")))
    }
}

/// Extracts the text layer of a PDF, one page at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| CorpusError::extraction(path, format!("failed to load PDF: {e}")))?;

        let pages = doc.get_pages();
        debug!("Extracting {} pages from {}", pages.len(), path.display());

        let mut text = String::new();
        for page_number in pages.keys() {
            let page_text = doc.extract_text(&[*page_number]).map_err(|e| {
                CorpusError::extraction(path, format!("page {page_number}: {e}"))
            })?;
            text.push_str(&page_text);
            text.push('\n');
        }
        Ok(text)
    }
}

/// Chooses an extractor from the file extension: PDF for `.pdf`, plain text
/// otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor {
    pdf: PdfExtractor,
    plain: PlainTextExtractor,
}

impl TextExtractor for DefaultExtractor {
    fn name(&self) -> &str {
        "default"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            self.pdf.extract(path)
        } else {
            self.plain.extract(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_plain_text_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("note.txt");
        fs::write(&path, "Quarterly results are in.").unwrap();

        let text = PlainTextExtractor.extract(&path).unwrap();
        assert_eq!(text, "Quarterly results are in.");
    }

    #[test]
    fn test_invalid_utf8_is_an_extraction_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.txt");
        fs::write(&path, [0xff, 0xfe, 0xfd]).unwrap();

        let err = PlainTextExtractor.extract(&path).unwrap_err();
        assert!(matches!(err, CorpusError::Extraction { .. }));
    }

    #[test]
    fn test_corrupt_pdf_is_an_extraction_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("newsletter.pdf");
        fs::write(&path, "definitely not a pdf").unwrap();

        let err = DefaultExtractor::default().extract(&path).unwrap_err();
        assert!(matches!(err, CorpusError::Extraction { .. }));
    }
}
