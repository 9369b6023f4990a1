//! Parallel analysis branches with a serialised merge.
//!
//! Every branch reads the same body text and proposes its own fields.
//! Proposals are merged into the record through the reducer as each branch
//! finishes; the scope end is the join barrier.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::stages::StageError;
use crate::models::{DocumentRecord, PaperFields};

/// One independent extraction over the body text.
pub trait BranchStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Proposed fields. Only this branch's own columns should be set.
    fn extract(&self, body_text: &str) -> Result<PaperFields, StageError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    pub succeeded: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

impl FanOutReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct FanOutCoordinator {
    branches: Vec<Box<dyn BranchStage>>,
}

impl FanOutCoordinator {
    pub fn new(branches: Vec<Box<dyn BranchStage>>) -> Self {
        Self { branches }
    }

    /// Run every branch to completion. Never fails: a failed or panicking
    /// branch is logged and its fields stay unset.
    pub fn run(&self, record: &mut DocumentRecord) -> FanOutReport {
        let path = record.path().display().to_string();
        let (body_text, fields) = record.body_and_fields_mut();
        let target = Mutex::new(fields);
        let parent_span = tracing::Span::current();

        let outcomes: Vec<(&'static str, Result<(), StageError>)> = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.branches.len());
            for branch in &self.branches {
                let target = &target;
                let parent_span = parent_span.clone();
                let handle = scope.spawn(move || -> Result<(), StageError> {
                    let _span =
                        tracing::info_span!(parent: &parent_span, "branch", name = branch.name())
                            .entered();
                    let proposed = branch.extract(body_text)?;
                    let mut fields = target.lock().unwrap_or_else(PoisonError::into_inner);
                    fields.merge_from(proposed);
                    Ok(())
                });
                handles.push((branch.name(), handle));
            }

            handles
                .into_iter()
                .map(|(name, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|panic| Err(StageError::Panicked(panic_message(&*panic))));
                    (name, result)
                })
                .collect()
        });

        let mut report = FanOutReport::default();
        for (name, result) in outcomes {
            match result {
                Ok(()) => report.succeeded.push(name),
                Err(e) => {
                    tracing::error!(path = %path, branch = name, error = %e, "Analysis branch failed");
                    report.failed.push(name);
                }
            }
        }

        tracing::info!(
            path = %path,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Fan-out joined"
        );
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
