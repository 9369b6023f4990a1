use std::path::{Path, PathBuf};

use super::fields::PaperFields;
use crate::pipeline::landmarks::Landmarks;

/// Per-document state threaded through one pipeline run.
///
/// Created empty for a path, mutated in place by each stage, and either
/// handed to persistence (relevant) or dropped at the end of the run.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    path: PathBuf,
    raw_text: String,
    landmarks: Landmarks,
    ocr_retry_done: bool,
    relevant: Option<bool>,
    fields: PaperFields,
}

impl DocumentRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            raw_text: String::new(),
            landmarks: Landmarks::default(),
            ocr_retry_done: false,
            relevant: None,
            fields: PaperFields::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    pub fn ocr_retry_done(&self) -> bool {
        self.ocr_retry_done
    }

    pub fn relevant(&self) -> Option<bool> {
        self.relevant
    }

    /// Only an explicit positive decision makes a record persistable.
    pub fn is_relevant(&self) -> bool {
        self.relevant == Some(true)
    }

    /// Replace the body text and recompute landmarks from it.
    pub fn set_body_text(&mut self, text: String) {
        self.raw_text = text;
        self.landmarks = Landmarks::locate(&self.raw_text);
    }

    /// Put recognised text in front of the existing body and recompute
    /// landmarks over the combined text.
    pub fn prepend_body_text(&mut self, text: &str) {
        self.raw_text = format!("{text}\n{}", self.raw_text);
        self.landmarks = Landmarks::locate(&self.raw_text);
    }

    /// Flip the OCR flag. Returns `false`, changing nothing, when an OCR
    /// attempt was already recorded for this document.
    pub fn mark_ocr_attempted(&mut self) -> bool {
        if self.ocr_retry_done {
            return false;
        }
        self.ocr_retry_done = true;
        true
    }

    /// Store the relevancy decision. The first decision is final.
    pub fn record_relevance(&mut self, relevant: bool) {
        match self.relevant {
            None => self.relevant = Some(relevant),
            Some(existing) => {
                tracing::warn!(
                    path = %self.path.display(),
                    existing,
                    ignored = relevant,
                    "Relevancy already decided, ignoring second decision"
                );
            }
        }
    }

    pub fn fields(&self) -> &PaperFields {
        &self.fields
    }

    /// Merge a writer's proposed fields through the reducer.
    pub fn merge_fields(&mut self, incoming: PaperFields) {
        self.fields.merge_from(incoming);
    }

    /// Read-only body text alongside mutable fields, for the fan-out step.
    pub(crate) fn body_and_fields_mut(&mut self) -> (&str, &mut PaperFields) {
        (&self.raw_text, &mut self.fields)
    }
}
