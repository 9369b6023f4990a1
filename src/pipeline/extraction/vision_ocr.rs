//! OCR of rendered pages through an Ollama vision model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::Engine as _;

use super::types::OcrEngine;
use crate::pipeline::oracle::VisionClient;

const OCR_PROMPT: &str = "\
Extract all visible text from this page image of a scientific paper. \
Preserve the reading order: title, authors, affiliations, abstract, keywords, body. \
Output plain text only, without commentary.";

/// Production OCR engine: one vision-model call per page image.
pub struct VisionOcr {
    vision_client: Arc<dyn VisionClient>,
    model_name: String,
}

impl VisionOcr {
    pub fn new(vision_client: Arc<dyn VisionClient>, model_name: String) -> Self {
        Self {
            vision_client,
            model_name,
        }
    }
}

impl OcrEngine for VisionOcr {
    fn recognize(&self, page_image: &[u8]) -> String {
        let _span = tracing::info_span!(
            "vision_ocr",
            model = %self.model_name,
            image_size = page_image.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        let images = vec![base64::engine::general_purpose::STANDARD.encode(page_image)];

        match self
            .vision_client
            .generate_with_images(&self.model_name, OCR_PROMPT, &images)
        {
            Ok(text) => {
                let text = text.trim().to_string();
                tracing::info!(
                    elapsed_ms = %start.elapsed().as_millis(),
                    text_len = text.len(),
                    "Vision OCR complete"
                );
                text
            }
            Err(e) => {
                tracing::warn!(error = %e, "Vision OCR failed, continuing without OCR text");
                String::new()
            }
        }
    }
}

// ──────────────────────────────────────────────
// Mock
// ──────────────────────────────────────────────

/// Returns a fixed text for every image and counts calls.
pub struct MockOcrEngine {
    text: String,
    calls: AtomicUsize,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _page_image: &[u8]) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone()
    }
}
