//! Pipeline engine: drives one record through the stage graph.
//!
//! Sequential stages run on the calling thread. The only parallelism is
//! inside the fan-out node, which joins before the engine moves on.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::extraction::{ExtractionError, OcrEngine, PageRenderer, TextExtractor};
use super::fanout::{FanOutCoordinator, FanOutReport};
use super::graph::{route_by_relevance, route_for_text_quality, Edge, Node, PipelineGraph, Router, StageId};
use super::oracle::{ExtractionOracle, ResearchScope};
use super::stages::{
    AnalysisBranch, CompleteMetadataStage, OcrFallbackStage, ReadAndLocateStage, RelevancyStage,
    SeedMetadataStage, StageError,
};
use crate::models::DocumentRecord;

/// Upper bound on stage executions per run. The canonical graph needs at
/// most six; anything beyond this is a cycle.
pub const MAX_STEPS: usize = 32;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unreadable document {path}: {reason}")]
    UnreadableDocument { path: PathBuf, reason: String },

    #[error("Stage {0} is not in the graph")]
    UnknownStage(StageId),

    #[error("Router {router} selected undeclared target {target}")]
    UndeclaredRoute { router: &'static str, target: StageId },

    #[error("Run exceeded {0} steps")]
    StepLimitExceeded(usize),

    #[error("Invalid pipeline graph: {0}")]
    InvalidGraph(String),
}

/// External services the stages call, shared across runs.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn TextExtractor>,
    pub renderer: Arc<dyn PageRenderer>,
    pub ocr: Arc<dyn OcrEngine>,
    pub oracle: Arc<dyn ExtractionOracle>,
}

/// What one run did, for logs and tests.
#[derive(Debug, Clone, Serialize)]
pub struct RunTrace {
    pub run_id: Uuid,
    pub visited: Vec<StageId>,
    pub fan_out: Option<FanOutReport>,
}

pub struct PipelineEngine {
    graph: PipelineGraph,
}

impl PipelineEngine {
    pub fn new(graph: PipelineGraph) -> Result<Self, PipelineError> {
        graph.validate().map_err(PipelineError::InvalidGraph)?;
        Ok(Self { graph })
    }

    /// The canonical paper pipeline:
    ///
    /// ```text
    /// seed_metadata -> read_and_locate -?-> [ocr_fallback ->] complete_metadata
    ///   -> check_relevancy -?-> analysis_fan_out -> end
    ///                      `--> end
    /// ```
    pub fn standard(collaborators: Collaborators, scope: ResearchScope) -> Result<Self, PipelineError> {
        let Collaborators {
            extractor,
            renderer,
            ocr,
            oracle,
        } = collaborators;
        let scope = Arc::new(scope);

        let graph = PipelineGraph::new(StageId::SeedMetadata)
            .stage(
                Box::new(SeedMetadataStage::new(extractor.clone())),
                Edge::Fixed(StageId::ReadAndLocate),
            )
            .stage(
                Box::new(ReadAndLocateStage::new(extractor)),
                Edge::Routed(Router::new(
                    "text_quality",
                    &[StageId::OcrFallback, StageId::CompleteMetadata],
                    route_for_text_quality,
                )),
            )
            .stage(
                Box::new(OcrFallbackStage::new(renderer, ocr)),
                Edge::Fixed(StageId::CompleteMetadata),
            )
            .stage(
                Box::new(CompleteMetadataStage::new(oracle.clone())),
                Edge::Fixed(StageId::CheckRelevancy),
            )
            .stage(
                Box::new(RelevancyStage::new(oracle.clone(), (*scope).clone())),
                Edge::Routed(Router::new(
                    "relevance",
                    &[StageId::AnalysisFanOut, StageId::End],
                    route_by_relevance,
                )),
            )
            .fan_out(
                StageId::AnalysisFanOut,
                FanOutCoordinator::new(AnalysisBranch::all(&oracle, &scope)),
                Edge::Fixed(StageId::End),
            );

        Self::new(graph)
    }

    pub fn run(&self, record: DocumentRecord) -> Result<DocumentRecord, PipelineError> {
        self.run_traced(record).map(|(record, _)| record)
    }

    pub fn run_traced(
        &self,
        mut record: DocumentRecord,
    ) -> Result<(DocumentRecord, RunTrace), PipelineError> {
        let mut trace = RunTrace {
            run_id: Uuid::new_v4(),
            visited: Vec::new(),
            fan_out: None,
        };
        let _span = tracing::info_span!(
            "pipeline_run",
            run_id = %trace.run_id,
            path = %record.path().display(),
        )
        .entered();

        let mut current = self
            .graph
            .entry()
            .ok_or_else(|| PipelineError::InvalidGraph("graph has no entry stage".into()))?;

        while current != StageId::End {
            if trace.visited.len() >= MAX_STEPS {
                return Err(PipelineError::StepLimitExceeded(MAX_STEPS));
            }
            trace.visited.push(current);

            match self.graph.node(current) {
                Some(Node::Stage(stage)) => {
                    let _stage_span = tracing::info_span!("stage", stage = %current).entered();
                    if let Err(e) = stage.run(&mut record) {
                        if e.is_fatal() {
                            tracing::error!(error = %e, "Stage failed, aborting run");
                            return Err(unreadable(&record, e));
                        }
                        tracing::warn!(error = %e, "Stage failed, continuing");
                    }
                }
                Some(Node::FanOut(coordinator)) => {
                    let _stage_span = tracing::info_span!("stage", stage = %current).entered();
                    trace.fan_out = Some(coordinator.run(&mut record));
                }
                None => return Err(PipelineError::UnknownStage(current)),
            }

            current = self.next(current, &record)?;
        }

        tracing::info!(
            steps = trace.visited.len(),
            relevant = ?record.relevant(),
            "Pipeline run complete"
        );
        Ok((record, trace))
    }

    fn next(&self, from: StageId, record: &DocumentRecord) -> Result<StageId, PipelineError> {
        match self.graph.edge(from) {
            Some(Edge::Fixed(to)) => Ok(*to),
            Some(Edge::Routed(router)) => {
                let target = (router.select)(record);
                if !router.targets.contains(&target) {
                    return Err(PipelineError::UndeclaredRoute {
                        router: router.name,
                        target,
                    });
                }
                tracing::debug!(router = router.name, from = %from, to = %target, "Routed");
                Ok(target)
            }
            None => Err(PipelineError::UnknownStage(from)),
        }
    }
}

fn unreadable(record: &DocumentRecord, error: StageError) -> PipelineError {
    let reason = match error {
        StageError::Unreadable(ExtractionError::UnreadableDocument { reason, .. }) => reason,
        other => other.to_string(),
    };
    PipelineError::UnreadableDocument {
        path: record.path().to_path_buf(),
        reason,
    }
}
