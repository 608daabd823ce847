//! Shared, async access to a workflow
//!
//! Cycles run on the blocking pool while the caller's task stays free. The
//! workflow sits behind a fair `tokio::sync::Mutex`: triggers are served in
//! the order they arrived, and one cascade finishes before the next starts.

use crate::core::{StageId, StageSnapshot, UpdateReport, Workflow, WorkflowError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cloneable handle to a workflow shared between tasks
#[derive(Debug, Clone)]
pub struct SharedWorkflow {
    inner: Arc<Mutex<Workflow>>,
}

impl SharedWorkflow {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            inner: Arc::new(Mutex::new(workflow)),
        }
    }

    /// Run `f` against the workflow on the blocking pool
    pub async fn with<F, R>(&self, f: F) -> Result<R, WorkflowError>
    where
        F: FnOnce(&mut Workflow) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut guard = self.inner.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *guard))
            .await
            .map_err(|e| WorkflowError::Join(e.to_string()))
    }

    /// Set a parameter on the named stage
    pub async fn set_parameter(
        &self,
        stage: &str,
        key: &str,
        value: Value,
    ) -> Result<UpdateReport, WorkflowError> {
        let (stage, key) = (stage.to_string(), key.to_string());
        self.with(move |workflow| {
            let id = workflow.require(&stage)?;
            workflow.set_parameter(id, &key, value)
        })
        .await?
    }

    /// Trigger a stage's update cycle
    pub async fn update(&self, id: StageId) -> Result<UpdateReport, WorkflowError> {
        self.with(move |workflow| workflow.update(id)).await?
    }

    /// Snapshots of every stage, taken between cascades
    pub async fn snapshots(&self) -> Vec<StageSnapshot> {
        self.inner.lock().await.snapshots()
    }

    /// Take the workflow back out, if this is the last handle
    pub fn try_into_inner(self) -> Result<Workflow, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
