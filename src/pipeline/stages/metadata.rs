use std::sync::Arc;

use super::{Stage, StageError};
use crate::models::DocumentRecord;
use crate::pipeline::graph::StageId;
use crate::pipeline::landmarks::{char_prefix, char_window, Landmarks};
use crate::pipeline::oracle::prompts::metadata_completion_prompt;
use crate::pipeline::oracle::{parse_stage_response, ExtractionOracle, METADATA_SCHEMA};

/// Zone length used when no page break was found.
pub const EXTRACTION_ZONE_CHARS: usize = 5000;

/// Characters of text passed along from the keywords heading.
pub const KEYWORD_HINT_CHARS: usize = 200;

/// Fills bibliographic fields that are still unset, from the first page.
pub struct CompleteMetadataStage {
    oracle: Arc<dyn ExtractionOracle>,
}

impl CompleteMetadataStage {
    pub fn new(oracle: Arc<dyn ExtractionOracle>) -> Self {
        Self { oracle }
    }
}

/// The front-matter zone: text up to the first page break, or a fixed
/// prefix when the text has no page breaks.
pub fn extraction_zone<'a>(text: &'a str, landmarks: &Landmarks) -> &'a str {
    match landmarks.page_end {
        Some(end) => char_prefix(text, end),
        None => char_prefix(text, EXTRACTION_ZONE_CHARS),
    }
}

/// Text following the keywords heading, when it sits on a located page.
pub fn keyword_hint<'a>(text: &'a str, landmarks: &Landmarks) -> &'a str {
    match (landmarks.keywords_start, landmarks.page_end) {
        (Some(start), Some(_)) => char_window(text, start, KEYWORD_HINT_CHARS),
        _ => "",
    }
}

impl Stage for CompleteMetadataStage {
    fn id(&self) -> StageId {
        StageId::CompleteMetadata
    }

    fn run(&self, record: &mut DocumentRecord) -> Result<(), StageError> {
        if record.raw_text().trim().is_empty() {
            tracing::warn!(path = %record.path().display(), "No body text, skipping metadata completion");
            return Ok(());
        }

        let unset = record.fields().unset_metadata_columns();
        if unset.is_empty() {
            tracing::debug!(path = %record.path().display(), "Metadata already complete");
            return Ok(());
        }

        let prompt = {
            let text = record.raw_text();
            let landmarks = record.landmarks();
            metadata_completion_prompt(
                &format!("{:#}", record.fields().missing_metadata_view()),
                extraction_zone(text, landmarks),
                keyword_hint(text, landmarks),
            )
        };

        let response = self.oracle.invoke(&prompt)?;
        // Only unset columns are asked for, and only those are kept
        let completed = parse_stage_response(&METADATA_SCHEMA.narrowed(&unset), &response)?;

        tracing::info!(
            path = %record.path().display(),
            filled = ?completed.set_columns(),
            "Metadata completed"
        );
        record.merge_fields(completed);
        Ok(())
    }
}
