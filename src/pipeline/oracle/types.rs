use super::OracleError;

/// External semantic-extraction service (an LLM behind some transport).
///
/// Injected into every stage that needs it, so tests swap in canned
/// responses instead of real calls.
pub trait ExtractionOracle: Send + Sync {
    fn invoke(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Vision-capable model endpoint used for OCR of rendered pages.
pub trait VisionClient: Send + Sync {
    /// `images` are base64-encoded PNGs.
    fn generate_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
    ) -> Result<String, OracleError>;
}
