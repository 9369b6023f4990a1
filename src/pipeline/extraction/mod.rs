pub mod types;
pub mod text;
pub mod pdfium;
pub mod vision_ocr;

pub use types::*;
pub use text::*;
pub use pdfium::*;
pub use vision_ocr::*;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot read document {path}: {reason}")]
    UnreadableDocument { path: PathBuf, reason: String },

    #[error("Document is password-protected")]
    PdfEncrypted,

    #[error("Rendering page {page} failed: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("PDFium library unavailable: {0}")]
    LibraryUnavailable(String),
}
