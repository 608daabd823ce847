//! Workflow - the chain container
//!
//! The workflow owns every stage. Stages refer to their neighbours through
//! [`StageId`] handles, so the chain never owns itself and all structural
//! edits go through the methods here, which keep `previous`/`next`
//! mutually consistent and acyclic.

use crate::core::{
    operation::Operation,
    stage::{Stage, StageId, StageSnapshot, ViewDescriptor},
    state::{FailurePolicy, StageFailure, StageStatus, UpdateReport},
};
use crate::execution::events::{error_sink, EventHandler, WorkflowEvent};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised by workflow operations
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Stage not found: {0}")]
    StageNotFound(StageId),

    #[error("No stage named '{0}'")]
    UnknownStage(String),

    #[error("Background update failed: {0}")]
    Join(String),
}

/// An ordered chain of stages
pub struct Workflow {
    /// Workflow name
    pub name: String,

    /// Stage slots, indexed by `StageId`; removed stages leave `None`
    pub(crate) stages: Vec<Option<Stage>>,

    pub(crate) head: Option<StageId>,

    pub(crate) failure_policy: FailurePolicy,

    /// Last version handed out to a stage result
    pub(crate) last_version: u64,

    handlers: Vec<EventHandler>,
}

impl Workflow {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stages: Vec::new(),
            head: None,
            failure_policy: FailurePolicy::default(),
            last_version: 0,
            handlers: Vec::new(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn set_failure_policy(&mut self, policy: FailurePolicy) {
        self.failure_policy = policy;
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&WorkflowEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    /// Add a sink that receives computation failures only
    pub fn add_error_sink<F>(&mut self, sink: F)
    where
        F: Fn(&StageFailure) + Send + Sync + 'static,
    {
        self.handlers.push(error_sink(sink));
    }

    pub(crate) fn emit(&self, event: WorkflowEvent) {
        for handler in &self.handlers {
            handler(&event);
        }
    }

    /// Get a stage by handle
    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(id.index()).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn stage_mut(&mut self, id: StageId) -> Option<&mut Stage> {
        self.stages.get_mut(id.index()).and_then(|slot| slot.as_mut())
    }

    pub(crate) fn get(&self, id: StageId) -> Result<&Stage, WorkflowError> {
        self.stage(id).ok_or(WorkflowError::StageNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: StageId) -> Result<&mut Stage, WorkflowError> {
        self.stage_mut(id).ok_or(WorkflowError::StageNotFound(id))
    }

    /// Find the first stage with the given display name
    pub fn find(&self, name: &str) -> Option<StageId> {
        self.ids()
            .into_iter()
            .find(|id| self.stage(*id).is_some_and(|s| s.name() == name))
    }

    /// Like [`find`](Self::find), but an error when nothing matches
    pub fn require(&self, name: &str) -> Result<StageId, WorkflowError> {
        self.find(name)
            .ok_or_else(|| WorkflowError::UnknownStage(name.to_string()))
    }

    pub fn head(&self) -> Option<StageId> {
        self.head
    }

    pub fn tail(&self) -> Option<StageId> {
        self.ids().last().copied()
    }

    /// Stage handles in chain order
    pub fn ids(&self) -> Vec<StageId> {
        let mut ids = Vec::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.stage(id).and_then(|s| s.next);
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.stages.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn allocate(&mut self, operation: Box<dyn Operation>) -> StageId {
        let id = StageId(self.stages.len() as u32);
        self.stages.push(Some(Stage::new(id, operation)));
        id
    }

    pub(crate) fn next_version(&mut self) -> u64 {
        self.last_version += 1;
        self.last_version
    }

    /// Append a stage to the end of the chain and run its update cycle
    pub fn push(&mut self, operation: Box<dyn Operation>) -> (StageId, UpdateReport) {
        let tail = self.tail();
        let id = self.allocate(operation);
        match tail {
            Some(tail) => self.link(tail, id),
            None => self.head = Some(id),
        }
        debug!("Appended stage {} to '{}'", id, self.name);

        let mut report = UpdateReport::new(id);
        self.propagate(id, &mut report);
        (id, report)
    }

    /// Insert a stage at the front of the chain and run its update cycle
    pub fn insert_first(&mut self, operation: Box<dyn Operation>) -> (StageId, UpdateReport) {
        let id = self.allocate(operation);
        let old_head = self.head.replace(id);

        let mut report = UpdateReport::new(id);
        if let Some(old_head) = old_head {
            self.link(id, old_head);
            self.invalidate_successor(id, &mut report);
        }
        debug!("Inserted stage {} at the front of '{}'", id, self.name);

        self.propagate(id, &mut report);
        (id, report)
    }

    /// Insert a stage after `after` and run its update cycle
    pub fn insert_after(
        &mut self,
        after: StageId,
        operation: Box<dyn Operation>,
    ) -> Result<(StageId, UpdateReport), WorkflowError> {
        let successor = self.get(after)?.next;
        let id = self.allocate(operation);

        self.link(after, id);
        let mut report = UpdateReport::new(id);
        if let Some(successor) = successor {
            self.link(id, successor);
            self.invalidate_successor(id, &mut report);
        }
        debug!("Inserted stage {} after {} in '{}'", id, after, self.name);

        self.propagate(id, &mut report);
        Ok((id, report))
    }

    /// Unlink and drop a stage, returning its operation
    ///
    /// The former successor now reads from the removed stage's
    /// predecessor, so it runs its update cycle; that report is returned.
    pub fn remove(
        &mut self,
        id: StageId,
    ) -> Result<(Box<dyn Operation>, Option<UpdateReport>), WorkflowError> {
        let (previous, next) = {
            let stage = self.get(id)?;
            (stage.previous, stage.next)
        };

        match (previous, next) {
            (Some(p), Some(n)) => self.link(p, n),
            (Some(p), None) => {
                if let Some(stage) = self.stage_mut(p) {
                    stage.next = None;
                }
            }
            (None, Some(n)) => {
                if let Some(stage) = self.stage_mut(n) {
                    stage.previous = None;
                }
                self.head = Some(n);
            }
            (None, None) => self.head = None,
        }

        let stage = self.stages[id.index()]
            .take()
            .ok_or(WorkflowError::StageNotFound(id))?;
        debug!("Removed stage {} ('{}') from '{}'", id, stage.name(), self.name);

        let report = next.map(|n| {
            let mut report = UpdateReport::new(n);
            self.propagate(n, &mut report);
            report
        });

        Ok((stage.operation, report))
    }

    fn link(&mut self, first: StageId, second: StageId) {
        if let Some(stage) = self.stage_mut(first) {
            stage.next = Some(second);
        }
        if let Some(stage) = self.stage_mut(second) {
            stage.previous = Some(first);
        }
    }

    /// Replace the views attached to a stage
    pub fn set_views(&mut self, id: StageId, views: Vec<ViewDescriptor>) -> Result<(), WorkflowError> {
        self.get_mut(id)?.views = views;
        Ok(())
    }

    /// Channel names of the predecessor's current result
    ///
    /// Recomputed only when the predecessor handle or its result version
    /// changed since the last read.
    pub fn available_channels(&self, id: StageId) -> Result<Vec<String>, WorkflowError> {
        let stage = self.get(id)?;
        let key = stage.previous.and_then(|p| {
            self.stage(p)
                .and_then(|prev| prev.result_version())
                .map(|version| (p, version))
        });

        if let Some(channels) = stage.cached_channels(key) {
            return Ok(channels);
        }

        let channels: Vec<String> = key
            .and_then(|(p, _)| self.stage(p))
            .and_then(|prev| prev.result())
            .map(|exp| exp.channels().into_iter().map(String::from).collect())
            .unwrap_or_default();

        stage.store_channels(key, channels.clone());
        Ok(channels)
    }

    /// Snapshot a stage for display
    pub fn snapshot(&self, id: StageId) -> Result<StageSnapshot, WorkflowError> {
        let stage = self.get(id)?;
        let operation = stage.operation();

        Ok(StageSnapshot {
            id,
            name: operation.name().to_string(),
            kind: operation.kind().to_string(),
            operation_id: operation.id(),
            status: stage.status,
            channels: stage
                .result()
                .map(|exp| exp.channels().into_iter().map(String::from).collect())
                .unwrap_or_default(),
            events: stage.result().map(|exp| exp.len()).unwrap_or(0),
            available_channels: self.available_channels(id)?,
            views: stage.views.clone(),
            last_error: stage.last_error.clone(),
        })
    }

    /// Snapshots of every stage in chain order
    pub fn snapshots(&self) -> Vec<StageSnapshot> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.snapshot(id).ok())
            .collect()
    }

    /// True when every stage is valid
    pub fn is_valid(&self) -> bool {
        self.ids()
            .into_iter()
            .all(|id| self.stage(id).is_some_and(|s| s.status == StageStatus::Valid))
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("stages", &self.ids())
            .field("failure_policy", &self.failure_policy)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
