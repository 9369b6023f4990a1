use std::sync::Arc;

use super::{Stage, StageError};
use crate::models::DocumentRecord;
use crate::pipeline::extraction::{assemble_body_text, TextExtractor};
use crate::pipeline::graph::StageId;

/// Extracts the body text and locates landmarks in it.
pub struct ReadAndLocateStage {
    extractor: Arc<dyn TextExtractor>,
}

impl ReadAndLocateStage {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }
}

impl Stage for ReadAndLocateStage {
    fn id(&self) -> StageId {
        StageId::ReadAndLocate
    }

    fn run(&self, record: &mut DocumentRecord) -> Result<(), StageError> {
        let document = self
            .extractor
            .open(record.path())
            .map_err(StageError::Unreadable)?;

        record.set_body_text(assemble_body_text(&document.pages));

        tracing::info!(
            path = %record.path().display(),
            pages = document.page_count(),
            chars = record.raw_text().chars().count(),
            landmarks = ?record.landmarks().sentinel_map(),
            "Body text extracted"
        );
        Ok(())
    }
}
