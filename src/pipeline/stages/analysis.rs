use std::fmt;
use std::sync::Arc;

use super::StageError;
use crate::models::PaperFields;
use crate::pipeline::fanout::BranchStage;
use crate::pipeline::oracle::prompts::{
    analysis_prompt, dataset_prompt, experimental_setup_prompt, methodology_prompt,
};
use crate::pipeline::oracle::{
    parse_stage_response, ExtractionOracle, ResearchScope, StageSchema, ANALYSIS_SCHEMA,
    DATASET_SCHEMA, EXPERIMENTAL_SETUP_SCHEMA, METHODOLOGY_SCHEMA,
};

/// The four independent analyses run on a relevant paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Methodology,
    Analysis,
    Dataset,
    ExperimentalSetup,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        Self::Methodology,
        Self::Analysis,
        Self::Dataset,
        Self::ExperimentalSetup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Methodology => "methodology",
            Self::Analysis => "analysis",
            Self::Dataset => "dataset",
            Self::ExperimentalSetup => "experimental_setup",
        }
    }

    /// Columns this branch owns.
    pub fn schema(&self) -> &'static StageSchema<'static> {
        match self {
            Self::Methodology => &METHODOLOGY_SCHEMA,
            Self::Analysis => &ANALYSIS_SCHEMA,
            Self::Dataset => &DATASET_SCHEMA,
            Self::ExperimentalSetup => &EXPERIMENTAL_SETUP_SCHEMA,
        }
    }

    fn prompt(&self, scope: &ResearchScope, body_text: &str) -> String {
        match self {
            Self::Methodology => methodology_prompt(scope, body_text),
            Self::Analysis => analysis_prompt(scope, body_text),
            Self::Dataset => dataset_prompt(scope, body_text),
            Self::ExperimentalSetup => experimental_setup_prompt(scope, body_text),
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An oracle-backed analysis branch.
pub struct AnalysisBranch {
    kind: AnalysisKind,
    oracle: Arc<dyn ExtractionOracle>,
    scope: Arc<ResearchScope>,
}

impl AnalysisBranch {
    pub fn new(kind: AnalysisKind, oracle: Arc<dyn ExtractionOracle>, scope: Arc<ResearchScope>) -> Self {
        Self { kind, oracle, scope }
    }

    /// One branch per kind, sharing oracle and scope.
    pub fn all(
        oracle: &Arc<dyn ExtractionOracle>,
        scope: &Arc<ResearchScope>,
    ) -> Vec<Box<dyn BranchStage>> {
        AnalysisKind::ALL
            .iter()
            .map(|kind| {
                Box::new(Self::new(*kind, oracle.clone(), scope.clone())) as Box<dyn BranchStage>
            })
            .collect()
    }
}

impl BranchStage for AnalysisBranch {
    fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    fn extract(&self, body_text: &str) -> Result<PaperFields, StageError> {
        let start = std::time::Instant::now();
        let response = self.oracle.invoke(&self.kind.prompt(&self.scope, body_text))?;
        let fields = parse_stage_response(self.kind.schema(), &response)?;

        tracing::info!(
            branch = %self.kind,
            elapsed_ms = %start.elapsed().as_millis(),
            fields = ?fields.set_columns(),
            "Analysis branch complete"
        );
        Ok(fields)
    }
}
