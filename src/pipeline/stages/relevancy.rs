use std::sync::Arc;

use super::{Stage, StageError};
use crate::models::DocumentRecord;
use crate::pipeline::graph::StageId;
use crate::pipeline::oracle::prompts::relevancy_prompt;
use crate::pipeline::oracle::{parse_relevancy_response, ExtractionOracle, ResearchScope};

/// Decides whether the paper belongs to the configured research scope.
///
/// Fails open: a missing abstract or any oracle problem keeps the paper.
pub struct RelevancyStage {
    oracle: Arc<dyn ExtractionOracle>,
    scope: ResearchScope,
}

impl RelevancyStage {
    pub fn new(oracle: Arc<dyn ExtractionOracle>, scope: ResearchScope) -> Self {
        Self { oracle, scope }
    }

    fn classify(&self, abstract_text: &str) -> Result<bool, StageError> {
        let response = self.oracle.invoke(&relevancy_prompt(&self.scope, abstract_text))?;
        Ok(parse_relevancy_response(&response)?)
    }
}

impl Stage for RelevancyStage {
    fn id(&self) -> StageId {
        StageId::CheckRelevancy
    }

    fn run(&self, record: &mut DocumentRecord) -> Result<(), StageError> {
        let abstract_text = record
            .fields()
            .abstract_text
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        let Some(abstract_text) = abstract_text else {
            tracing::warn!(
                path = %record.path().display(),
                "No abstract, assuming relevant"
            );
            record.record_relevance(true);
            return Ok(());
        };

        match self.classify(&abstract_text) {
            Ok(relevant) => {
                tracing::info!(
                    path = %record.path().display(),
                    scope = %self.scope.name,
                    relevant,
                    "Relevancy decided"
                );
                record.record_relevance(relevant);
            }
            Err(e) => {
                tracing::error!(
                    path = %record.path().display(),
                    error = %e,
                    "Relevancy check failed, assuming relevant"
                );
                record.record_relevance(true);
            }
        }
        Ok(())
    }
}
