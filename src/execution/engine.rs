//! Update engine - validation, recomputation and propagation
//!
//! A stage runs its update cycle when its operation's parameters change or
//! when its predecessor signals that it became valid. The cycle is:
//!
//! 1. status -> updating
//! 2. read the predecessor's result
//! 3. `validate`; on rejection the stage becomes invalid and the cascade stops
//! 4. `apply`; failures go to the event handlers
//! 5. status -> valid
//! 6. signal the successor, whose cycle completes before this one returns
//!
//! Any valid -> invalid transition additionally forces the successor's
//! status to invalid (one hop, no cycle).

use crate::core::{
    operation::Operation,
    stage::{StageId, StageResult},
    state::{FailurePolicy, StageFailure, StageStatus, UpdateReport},
    workflow::{Workflow, WorkflowError},
};
use crate::execution::events::WorkflowEvent;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of a single stage cycle
enum CycleOutcome {
    /// Stage became valid; signal this successor next
    Signal(Option<StageId>),
    /// Stage became invalid; the cascade stops here
    Halt,
}

impl Workflow {
    /// Explicitly trigger a stage's update cycle
    pub fn update(&mut self, id: StageId) -> Result<UpdateReport, WorkflowError> {
        self.get(id)?;
        let mut report = UpdateReport::new(id);
        self.propagate(id, &mut report);
        Ok(report)
    }

    /// Set one operation parameter; the stage updates only if the value changed
    pub fn set_parameter<V: Into<Value>>(
        &mut self,
        id: StageId,
        key: &str,
        value: V,
    ) -> Result<UpdateReport, WorkflowError> {
        let (_, report) = self.edit_operation(id, |operation| {
            operation.parameters_mut().set(key, value);
        })?;
        Ok(report)
    }

    /// Mutate a stage's operation; the stage updates if its parameters changed
    pub fn edit_operation<F, R>(
        &mut self,
        id: StageId,
        edit: F,
    ) -> Result<(R, UpdateReport), WorkflowError>
    where
        F: FnOnce(&mut dyn Operation) -> R,
    {
        let stage = self.get_mut(id)?;
        let before = stage.operation.parameters().revision();
        let output = edit(stage.operation.as_mut());
        let changed = stage.operation.parameters().revision() != before;

        let mut report = UpdateReport::new(id);
        if changed {
            debug!("Parameters of stage {} changed", id);
            self.propagate(id, &mut report);
        }
        Ok((output, report))
    }

    /// Mark a stage invalid from outside its own cycle
    ///
    /// Only the status changes; the successor is forced invalid as well when
    /// the stage was valid.
    pub fn invalidate(&mut self, id: StageId) -> Result<UpdateReport, WorkflowError> {
        let was = self.get(id)?.status;
        let mut report = UpdateReport::new(id);

        self.set_status(id, StageStatus::Invalid);
        if was == StageStatus::Valid {
            self.invalidate_successor(id, &mut report);
        }
        Ok(report)
    }

    /// Run `start`'s cycle and every forward signal it causes, in order
    pub(crate) fn propagate(&mut self, start: StageId, report: &mut UpdateReport) {
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            cursor = match self.run_cycle(id, report) {
                CycleOutcome::Signal(next) => next,
                CycleOutcome::Halt => None,
            };
        }

        info!(
            "Update of '{}' from {} ran {} cycle(s), {} failure(s)",
            self.name,
            start,
            report.cycles.len(),
            report.failures.len()
        );
    }

    fn run_cycle(&mut self, id: StageId, report: &mut UpdateReport) -> CycleOutcome {
        let (was, previous, name) = match self.stage(id) {
            Some(stage) => (stage.status, stage.previous, stage.name().to_string()),
            None => return CycleOutcome::Halt,
        };

        report.cycles.push(id);
        self.emit(WorkflowEvent::CycleStarted {
            stage: id,
            name: name.clone(),
        });
        self.set_status(id, StageStatus::Updating);

        // An invalid predecessor's result is not to be trusted
        let input = previous
            .and_then(|p| self.stage(p))
            .filter(|prev| prev.status == StageStatus::Valid)
            .and_then(|prev| prev.result().cloned());

        let Some(stage) = self.stage(id) else {
            return CycleOutcome::Halt;
        };

        if !stage.operation.validate(input.as_deref()) {
            debug!("Stage {} ('{}') rejected its input", id, name);
            report.rejected = Some(id);
            self.emit(WorkflowEvent::ValidationRejected { stage: id });
            self.set_status(id, StageStatus::Invalid);
            if was == StageStatus::Valid {
                self.invalidate_successor(id, report);
            }
            return CycleOutcome::Halt;
        }

        let applied = stage.operation.apply(input.as_deref());
        match applied {
            Ok(experiment) => {
                let version = self.next_version();
                let events = experiment.len();
                if let Some(stage) = self.stage_mut(id) {
                    stage.result = Some(StageResult {
                        experiment: Arc::new(experiment),
                        version,
                    });
                    stage.last_error = None;
                }
                self.emit(WorkflowEvent::ResultUpdated {
                    stage: id,
                    version,
                    events,
                });
            }
            Err(e) => {
                error!("Stage {} ('{}') failed: {}", id, name, e);
                let failure = StageFailure {
                    stage: id,
                    operation: name,
                    message: e.to_string(),
                    at: chrono::Utc::now(),
                };
                if let Some(stage) = self.stage_mut(id) {
                    stage.last_error = Some(failure.message.clone());
                }
                self.emit(WorkflowEvent::ComputationFailed(failure.clone()));
                report.failures.push(failure);

                if self.failure_policy == FailurePolicy::Invalidate {
                    self.set_status(id, StageStatus::Invalid);
                    if was == StageStatus::Valid {
                        self.invalidate_successor(id, report);
                    }
                    return CycleOutcome::Halt;
                }
            }
        }

        self.set_status(id, StageStatus::Valid);
        CycleOutcome::Signal(self.stage(id).and_then(|s| s.next))
    }

    /// Status-only transition; emits `StatusChanged` when the status moved
    fn set_status(&mut self, id: StageId, status: StageStatus) -> StageStatus {
        let Some(stage) = self.stage_mut(id) else {
            return status;
        };
        let old = std::mem::replace(&mut stage.status, status);
        if old != status {
            self.emit(WorkflowEvent::StatusChanged {
                stage: id,
                from: old,
                to: status,
            });
        }
        old
    }

    /// Force the successor of `id` to invalid without running its cycle
    pub(crate) fn invalidate_successor(&mut self, id: StageId, report: &mut UpdateReport) {
        let Some(next) = self.stage(id).and_then(|s| s.next) else {
            return;
        };
        let old = self.set_status(next, StageStatus::Invalid);
        if old != StageStatus::Invalid {
            debug!("Stage {} invalidated by {}", next, id);
            report.invalidated.push(next);
            self.emit(WorkflowEvent::Invalidated { stage: next, by: id });
        }
    }
}
