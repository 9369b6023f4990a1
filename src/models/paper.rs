use chrono::{DateTime, Utc};
use serde::Serialize;

use super::fields::PaperFields;

/// A persisted paper row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPaper {
    pub path: String,
    pub relevant: bool,
    pub processed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: PaperFields,
}
