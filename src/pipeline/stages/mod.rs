//! Pipeline stages: units of work over a `DocumentRecord`.
//!
//! A stage reads the record, calls its collaborators, and writes back.
//! Recoverable failures are returned as `StageError` and logged by the
//! engine at the stage boundary; only `Unreadable` aborts a run.

pub mod seed;
pub mod read;
pub mod ocr;
pub mod metadata;
pub mod relevancy;
pub mod analysis;

pub use seed::*;
pub use read::*;
pub use ocr::*;
pub use metadata::*;
pub use relevancy::*;
pub use analysis::*;

use thiserror::Error;

use super::extraction::ExtractionError;
use super::graph::StageId;
use super::oracle::OracleError;
use crate::models::DocumentRecord;

#[derive(Error, Debug)]
pub enum StageError {
    /// The document cannot be opened at all. Fatal to the run.
    #[error("Document unreadable: {0}")]
    Unreadable(ExtractionError),

    #[error("Oracle call failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Branch panicked: {0}")]
    Panicked(String),
}

impl StageError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unreadable(_))
    }
}

pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    fn run(&self, record: &mut DocumentRecord) -> Result<(), StageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unreadable_is_fatal() {
        let unreadable = StageError::Unreadable(ExtractionError::PdfEncrypted);
        assert!(unreadable.is_fatal());
        assert!(!StageError::Oracle(OracleError::Timeout(5)).is_fatal());
        assert!(!StageError::Extraction(ExtractionError::PdfEncrypted).is_fatal());
        assert!(!StageError::Panicked("boom".into()).is_fatal());
    }
}
