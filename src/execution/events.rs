//! Workflow events and handlers

use crate::core::{StageFailure, StageId, StageStatus};
use std::sync::Arc;

/// Events that can occur while a workflow reacts to a change
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    CycleStarted {
        stage: StageId,
        name: String,
    },
    StatusChanged {
        stage: StageId,
        from: StageStatus,
        to: StageStatus,
    },
    ResultUpdated {
        stage: StageId,
        version: u64,
        events: usize,
    },
    ValidationRejected {
        stage: StageId,
    },
    /// The stage's operation failed to compute a result
    ComputationFailed(StageFailure),
    /// Status-only invalidation caused by the predecessor
    Invalidated {
        stage: StageId,
        by: StageId,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&WorkflowEvent) + Send + Sync>;

/// Wrap an error sink so it only sees computation failures
pub fn error_sink<F>(sink: F) -> EventHandler
where
    F: Fn(&StageFailure) + Send + Sync + 'static,
{
    Arc::new(move |event: &WorkflowEvent| {
        if let WorkflowEvent::ComputationFailed(failure) = event {
            sink(failure);
        }
    })
}
