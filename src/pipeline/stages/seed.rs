use std::sync::Arc;

use super::{Stage, StageError};
use crate::models::{DocumentRecord, PaperFields};
use crate::pipeline::extraction::{EmbeddedMetadata, TextExtractor};
use crate::pipeline::graph::StageId;

/// Seeds bibliographic fields from the document's embedded info dictionary.
///
/// Failure to open the document here is not fatal; the next stage opens
/// it again and decides.
pub struct SeedMetadataStage {
    extractor: Arc<dyn TextExtractor>,
}

impl SeedMetadataStage {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }
}

impl Stage for SeedMetadataStage {
    fn id(&self) -> StageId {
        StageId::SeedMetadata
    }

    fn run(&self, record: &mut DocumentRecord) -> Result<(), StageError> {
        let document = self.extractor.open(record.path())?;
        let seeded = seed_fields(&document.metadata);

        tracing::debug!(
            path = %record.path().display(),
            seeded = ?seeded.set_columns(),
            "Seeded fields from embedded metadata"
        );
        record.merge_fields(seeded);
        Ok(())
    }
}

/// Fields trusted from embedded metadata: a real title and the keyword list.
pub fn seed_fields(metadata: &EmbeddedMetadata) -> PaperFields {
    let mut fields = PaperFields::default();

    fields.title = metadata
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("untitled"))
        .map(str::to_string);

    let keywords: Vec<String> = metadata
        .keywords
        .as_deref()
        .unwrap_or_default()
        .split([',', ';'])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    if !keywords.is_empty() {
        fields.keywords = Some(keywords);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{MockTextExtractor, SourceDocument};

    fn metadata(title: Option<&str>, keywords: Option<&str>) -> EmbeddedMetadata {
        EmbeddedMetadata {
            title: title.map(str::to_string),
            keywords: keywords.map(str::to_string),
        }
    }

    #[test]
    fn real_title_is_seeded() {
        let fields = seed_fields(&metadata(Some("Deep Load Forecasting"), None));
        assert_eq!(fields.title.as_deref(), Some("Deep Load Forecasting"));
        assert_eq!(fields.keywords, None);
    }

    #[test]
    fn untitled_and_blank_titles_are_ignored() {
        for title in ["untitled", "Untitled", "  ", ""] {
            assert_eq!(seed_fields(&metadata(Some(title), None)).title, None, "{title:?}");
        }
    }

    #[test]
    fn keywords_split_on_commas_and_semicolons() {
        let fields = seed_fields(&metadata(None, Some("LSTM, load; ,forecasting")));
        assert_eq!(
            fields.keywords,
            Some(vec!["LSTM".into(), "load".into(), "forecasting".into()])
        );
    }

    #[test]
    fn stage_merges_seeded_title() {
        let extractor = Arc::new(MockTextExtractor::new().with_document(
            "a.pdf",
            SourceDocument {
                metadata: metadata(Some("Seeded"), None),
                pages: vec![],
            },
        ));
        let stage = SeedMetadataStage::new(extractor);
        let mut record = DocumentRecord::new("a.pdf");
        stage.run(&mut record).unwrap();
        assert_eq!(record.fields().title.as_deref(), Some("Seeded"));
    }

    #[test]
    fn unreadable_document_is_a_recoverable_error() {
        let stage = SeedMetadataStage::new(Arc::new(MockTextExtractor::new()));
        let mut record = DocumentRecord::new("missing.pdf");
        let err = stage.run(&mut record).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(record.fields(), &PaperFields::default());
    }
}
