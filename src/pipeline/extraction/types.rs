use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Document-info dictionary entries that can seed the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedMetadata {
    pub title: Option<String>,
    pub keywords: Option<String>,
}

/// An opened document: its info dictionary and per-page text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocument {
    pub metadata: EmbeddedMetadata,
    pub pages: Vec<String>,
}

impl SourceDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Text and metadata extraction abstraction (allows mocking for tests).
pub trait TextExtractor: Send + Sync {
    /// `UnreadableDocument` when the file cannot be opened or parsed at all.
    fn open(&self, path: &Path) -> Result<SourceDocument, ExtractionError>;
}

/// Rasterizes one page of a document to PNG bytes.
pub trait PageRenderer: Send + Sync {
    fn render_page(
        &self,
        path: &Path,
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// OCR over a page image. Failures yield an empty string.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, page_image: &[u8]) -> String;
}
