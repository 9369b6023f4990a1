use std::sync::Arc;

use super::{Stage, StageError};
use crate::models::DocumentRecord;
use crate::pipeline::extraction::{OcrEngine, PageRenderer};
use crate::pipeline::graph::StageId;

/// Rendering resolution for the OCR pass.
pub const OCR_DPI: u32 = 300;

/// Only the first page is recognised: it carries the front matter.
pub const OCR_PAGE_INDEX: usize = 0;

/// One-shot OCR of the first page, prepended to the body text.
pub struct OcrFallbackStage {
    renderer: Arc<dyn PageRenderer>,
    ocr: Arc<dyn OcrEngine>,
}

impl OcrFallbackStage {
    pub fn new(renderer: Arc<dyn PageRenderer>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { renderer, ocr }
    }
}

impl Stage for OcrFallbackStage {
    fn id(&self) -> StageId {
        StageId::OcrFallback
    }

    fn run(&self, record: &mut DocumentRecord) -> Result<(), StageError> {
        if !record.mark_ocr_attempted() {
            tracing::warn!(path = %record.path().display(), "OCR already attempted, skipping");
            return Ok(());
        }

        let ocr_text = match self.renderer.render_page(record.path(), OCR_PAGE_INDEX, OCR_DPI) {
            Ok(image) => self.ocr.recognize(&image),
            Err(e) => {
                tracing::warn!(
                    path = %record.path().display(),
                    error = %e,
                    "First page could not be rendered for OCR"
                );
                String::new()
            }
        };

        if ocr_text.trim().is_empty() {
            tracing::info!(path = %record.path().display(), "OCR produced no text");
            return Ok(());
        }

        record.prepend_body_text(&ocr_text);
        tracing::info!(
            path = %record.path().display(),
            ocr_chars = ocr_text.chars().count(),
            landmarks = ?record.landmarks().sentinel_map(),
            "OCR text prepended"
        );
        Ok(())
    }
}
