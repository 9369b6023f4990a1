//! Typed pipeline graph: stage identifiers, nodes, edges and routers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::fanout::FanOutCoordinator;
use super::stages::Stage;
use crate::models::DocumentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    SeedMetadata,
    ReadAndLocate,
    OcrFallback,
    CompleteMetadata,
    CheckRelevancy,
    AnalysisFanOut,
    End,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeedMetadata => "seed_metadata",
            Self::ReadAndLocate => "read_and_locate",
            Self::OcrFallback => "ocr_fallback",
            Self::CompleteMetadata => "complete_metadata",
            Self::CheckRelevancy => "check_relevancy",
            Self::AnalysisFanOut => "analysis_fan_out",
            Self::End => "end",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub enum Node {
    Stage(Box<dyn Stage>),
    FanOut(FanOutCoordinator),
}

/// A conditional edge. `select` must only return one of `targets`.
pub struct Router {
    pub name: &'static str,
    pub targets: BTreeSet<StageId>,
    pub select: fn(&DocumentRecord) -> StageId,
}

impl Router {
    pub fn new(name: &'static str, targets: &[StageId], select: fn(&DocumentRecord) -> StageId) -> Self {
        Self {
            name,
            targets: targets.iter().copied().collect(),
            select,
        }
    }
}

pub enum Edge {
    Fixed(StageId),
    Routed(Router),
}

/// Where a record goes after read & locate.
///
/// OCR is only worth trying once, and only when neither the abstract nor
/// the introduction could be found.
pub fn route_for_text_quality(record: &DocumentRecord) -> StageId {
    if record.ocr_retry_done() {
        StageId::CompleteMetadata
    } else if record.landmarks().missing_front_matter() {
        StageId::OcrFallback
    } else {
        StageId::CompleteMetadata
    }
}

pub fn route_by_relevance(record: &DocumentRecord) -> StageId {
    if record.is_relevant() {
        StageId::AnalysisFanOut
    } else {
        StageId::End
    }
}

#[derive(Default)]
pub struct PipelineGraph {
    entry: Option<StageId>,
    nodes: BTreeMap<StageId, Node>,
    edges: BTreeMap<StageId, Edge>,
}

impl PipelineGraph {
    pub fn new(entry: StageId) -> Self {
        Self {
            entry: Some(entry),
            ..Default::default()
        }
    }

    pub fn stage(mut self, stage: Box<dyn Stage>, edge: Edge) -> Self {
        let id = stage.id();
        self.nodes.insert(id, Node::Stage(stage));
        self.edges.insert(id, edge);
        self
    }

    pub fn fan_out(mut self, id: StageId, coordinator: FanOutCoordinator, edge: Edge) -> Self {
        self.nodes.insert(id, Node::FanOut(coordinator));
        self.edges.insert(id, edge);
        self
    }

    pub fn entry(&self) -> Option<StageId> {
        self.entry
    }

    pub fn node(&self, id: StageId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: StageId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Check that the entry and every edge target exist. `End` is implicit.
    pub fn validate(&self) -> Result<(), String> {
        let known = |id: &StageId| *id == StageId::End || self.nodes.contains_key(id);

        match self.entry {
            Some(entry) if known(&entry) => {}
            Some(entry) => return Err(format!("entry stage {entry} is not in the graph")),
            None => return Err("graph has no entry stage".into()),
        }
        if self.nodes.contains_key(&StageId::End) {
            return Err("end is terminal and cannot be a node".into());
        }

        for (from, edge) in &self.edges {
            let targets: Vec<StageId> = match edge {
                Edge::Fixed(to) => vec![*to],
                Edge::Routed(router) => {
                    if router.targets.is_empty() {
                        return Err(format!("router {} on {from} has no targets", router.name));
                    }
                    router.targets.iter().copied().collect()
                }
            };
            if let Some(missing) = targets.iter().find(|t| !known(*t)) {
                return Err(format!("edge {from} -> {missing} targets an unknown stage"));
            }
        }
        Ok(())
    }
}
