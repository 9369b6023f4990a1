//! PDF text, metadata and page rendering through PDFium.
//!
//! `PdfiumExtractor` holds no library handle: `Pdfium` is `!Send`, so every
//! call binds its own instance. Binding an already-loaded library is cheap.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageOutputFormat};
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::{EmbeddedMetadata, PageRenderer, SourceDocument, TextExtractor};
use super::ExtractionError;

/// Longest edge of a rendered page, in pixels.
const MAX_DIMENSION_PX: u32 = 4096;

const POINTS_PER_INCH: f32 = 72.0;

const LIB_PATH_VAR: &str = "PDFIUM_DYNAMIC_LIB_PATH";

pub struct PdfiumExtractor;

impl PdfiumExtractor {
    /// Fails early when no PDFium library can be bound.
    pub fn new() -> Result<Self, ExtractionError> {
        load_pdfium().map(|_| Self)
    }
}

/// Directories next to the binary that may ship a bundled PDFium.
fn bundled_library_dirs() -> Vec<PathBuf> {
    let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    else {
        return Vec::new();
    };
    vec![
        exe_dir.join("pdfium").join("lib"),
        exe_dir.join("..").join("pdfium").join("lib"),
        exe_dir,
    ]
}

/// Bind PDFium from `$PDFIUM_DYNAMIC_LIB_PATH` when set, otherwise from a
/// bundled directory, otherwise from the system search path.
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(explicit) = std::env::var(LIB_PATH_VAR) {
        return Pdfium::bind_to_library(&explicit)
            .map(Pdfium::new)
            .map_err(|e| {
                ExtractionError::LibraryUnavailable(format!("{LIB_PATH_VAR}={explicit}: {e}"))
            });
    }

    for dir in bundled_library_dirs() {
        let candidate = Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&candidate) {
            debug!(dir = %dir.display(), "Bound bundled PDFium");
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| {
            ExtractionError::LibraryUnavailable(format!(
                "no PDFium found (set {LIB_PATH_VAR} or install it system-wide): {e}"
            ))
        })
}

fn open_document<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, ExtractionError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| map_load_error(path, e))
}

/// Password-protected files get their own error; everything else is unreadable.
fn map_load_error(path: &Path, e: PdfiumError) -> ExtractionError {
    let reason = e.to_string();
    let needs_password = ["password", "encrypt"]
        .iter()
        .any(|hint| reason.to_ascii_lowercase().contains(hint));
    if needs_password {
        return ExtractionError::PdfEncrypted;
    }
    ExtractionError::UnreadableDocument {
        path: path.to_path_buf(),
        reason,
    }
}

/// Empty and whitespace-only tags count as absent.
fn metadata_tag(document: &PdfDocument<'_>, tag: PdfDocumentMetadataTagType) -> Option<String> {
    document
        .metadata()
        .get(tag)
        .map(|t| t.value().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Pixel size of a page rendered at `dpi`. Each edge is at least 1 px; when
/// the longer edge would exceed `MAX_DIMENSION_PX` both edges shrink by the
/// same factor.
fn render_size(width_pt: f32, height_pt: f32, dpi: u32) -> (u32, u32) {
    let px_per_pt = dpi as f32 / POINTS_PER_INCH;
    let width = (width_pt * px_per_pt).max(1.0);
    let height = (height_pt * px_per_pt).max(1.0);

    let shrink = (MAX_DIMENSION_PX as f32 / width.max(height)).min(1.0);
    let to_px = |edge: f32| ((edge * shrink) as u32).clamp(1, MAX_DIMENSION_PX);
    (to_px(width), to_px(height))
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ExtractionError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding: {e}")))?;
    Ok(buffer.into_inner())
}

impl TextExtractor for PdfiumExtractor {
    fn open(&self, path: &Path) -> Result<SourceDocument, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = open_document(&pdfium, path)?;

        let metadata = EmbeddedMetadata {
            title: metadata_tag(&document, PdfDocumentMetadataTagType::Title),
            keywords: metadata_tag(&document, PdfDocumentMetadataTagType::Keywords),
        };

        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            match page.text() {
                Ok(text) => pages.push(text.all()),
                Err(e) => {
                    warn!(path = %path.display(), page = index, error = %e, "Page text unavailable");
                    pages.push(String::new());
                }
            }
        }

        debug!(
            path = %path.display(),
            pages = pages.len(),
            has_title = metadata.title.is_some(),
            "Opened PDF"
        );

        Ok(SourceDocument { metadata, pages })
    }
}

impl PageRenderer for PdfiumExtractor {
    fn render_page(
        &self,
        path: &Path,
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let render_error = |reason: String| ExtractionError::PdfRendering {
            page: page_index,
            reason,
        };

        let pdfium = load_pdfium()?;
        let document = open_document(&pdfium, path)?;
        let pages = document.pages();
        let page = u16::try_from(page_index)
            .ok()
            .and_then(|index| pages.get(index).ok())
            .ok_or_else(|| render_error(format!("document has {} pages", pages.len())))?;

        let (width, height) = render_size(page.width().value, page.height().value, dpi);
        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(width as i32)
                    .set_maximum_height(height as i32),
            )
            .map_err(|e| render_error(e.to_string()))?;

        let png = encode_png(&bitmap.as_image())?;
        debug!(
            path = %path.display(),
            page = page_index,
            width,
            height,
            bytes = png.len(),
            "Page rendered"
        );
        Ok(png)
    }
}

// ── Mocks for testing ──────────────────────────────────────

/// In-memory documents keyed by path. Unknown paths are unreadable.
#[derive(Default)]
pub struct MockTextExtractor {
    documents: HashMap<PathBuf, SourceDocument>,
    opens: AtomicUsize,
}

impl MockTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<PathBuf>, document: SourceDocument) -> Self {
        self.documents.insert(path.into(), document);
        self
    }

    /// Convenience: a document with an optional embedded title and the given pages.
    pub fn with_pages(self, path: impl Into<PathBuf>, title: Option<&str>, pages: &[&str]) -> Self {
        let document = SourceDocument {
            metadata: EmbeddedMetadata {
                title: title.map(str::to_string),
                ..Default::default()
            },
            pages: pages.iter().map(|p| p.to_string()).collect(),
        };
        self.with_document(path, document)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl TextExtractor for MockTextExtractor {
    fn open(&self, path: &Path) -> Result<SourceDocument, ExtractionError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| ExtractionError::UnreadableDocument {
                path: path.to_path_buf(),
                reason: "not a PDF".into(),
            })
    }
}

/// Returns a minimal PNG for every page, or fails every call.
pub struct MockPageRenderer {
    fail: bool,
    renders: AtomicUsize,
}

impl MockPageRenderer {
    pub fn new() -> Self {
        Self {
            fail: false,
            renders: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            renders: AtomicUsize::new(0),
        }
    }

    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl Default for MockPageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer for MockPageRenderer {
    fn render_page(
        &self,
        _path: &Path,
        page_index: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExtractionError::PdfRendering {
                page: page_index,
                reason: "mock renderer configured to fail".into(),
            });
        }
        Ok(minimal_png())
    }
}

/// A 1x1 black PNG.
pub fn minimal_png() -> Vec<u8> {
    encode_png(&DynamicImage::new_rgb8(1, 1)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_page_at_ocr_resolution() {
        // 8.5 x 11 in is 2550 x 3300 px at 300 dpi
        let (width, height) = render_size(612.0, 792.0, 300);
        assert!(width.abs_diff(2550) <= 1, "width {width}");
        assert!(height.abs_diff(3300) <= 1, "height {height}");
    }

    #[test]
    fn oversized_page_is_capped_on_its_long_edge() {
        let (width, height) = render_size(2000.0, 4000.0, 300);
        assert!(height <= MAX_DIMENSION_PX && height.abs_diff(MAX_DIMENSION_PX) <= 1);
        assert!(width.abs_diff(MAX_DIMENSION_PX / 2) <= 1, "width {width}");
    }

    #[test]
    fn degenerate_page_still_has_a_pixel() {
        assert_eq!(render_size(0.0, 0.0, 300), (1, 1));
    }

    #[test]
    fn minimal_png_decodes() {
        use image::GenericImageView;
        let image = image::load_from_memory(&minimal_png()).unwrap();
        assert_eq!((image.width(), image.height()), (1, 1));
    }

    #[test]
    fn mock_extractor_serves_known_paths() {
        let mock = MockTextExtractor::new().with_pages("a.pdf", Some("A Title"), &["p1", "p2"]);
        let doc = mock.open(Path::new("a.pdf")).unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("A Title"));
        assert_eq!(doc.page_count(), 2);
        assert_eq!(mock.open_count(), 1);
    }

    #[test]
    fn mock_extractor_unknown_path_is_unreadable() {
        let mock = MockTextExtractor::new();
        let err = mock.open(Path::new("missing.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::UnreadableDocument { .. }));
    }

    #[test]
    fn mock_renderer_counts_and_fails_on_request() {
        let ok = MockPageRenderer::new();
        let png = ok.render_page(Path::new("a.pdf"), 0, 300).unwrap();
        assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
        assert_eq!(ok.render_count(), 1);

        let failing = MockPageRenderer::failing();
        assert!(failing.render_page(Path::new("a.pdf"), 0, 300).is_err());
        assert_eq!(failing.render_count(), 1);
    }
}
