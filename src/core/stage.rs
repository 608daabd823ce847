//! Stage domain model

use crate::core::{experiment::Experiment, operation::Operation, state::StageStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Handle of a stage inside its [`Workflow`](crate::core::Workflow)
///
/// Handles index the workflow's stage slots and are never reused, so a
/// handle to a removed stage stays dangling instead of aliasing a new one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageId(pub u32);

impl StageId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StageId({})", self.0)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A view attached to a stage's result (opaque to the engine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    /// View type, e.g. "histogram"
    pub kind: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Channel the view plots, if any
    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl ViewDescriptor {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: None,
            channel: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }
}

/// A computed result together with its workflow-wide version
#[derive(Debug, Clone)]
pub struct StageResult {
    pub experiment: Arc<Experiment>,
    pub version: u64,
}

/// Cache key for derived channels: predecessor handle and result version
pub(crate) type ChannelKey = Option<(StageId, u64)>;

#[derive(Debug)]
struct ChannelCache {
    key: ChannelKey,
    channels: Vec<String>,
}

/// A single stage in a workflow
#[derive(Debug)]
pub struct Stage {
    pub(crate) id: StageId,

    /// The operation this stage applies (exclusively owned)
    pub(crate) operation: Box<dyn Operation>,

    /// Last successfully computed result
    pub(crate) result: Option<StageResult>,

    pub(crate) views: Vec<ViewDescriptor>,

    pub(crate) previous: Option<StageId>,

    pub(crate) next: Option<StageId>,

    pub(crate) status: StageStatus,

    /// Message of the last computation failure, cleared on success
    pub(crate) last_error: Option<String>,

    channel_cache: RefCell<Option<ChannelCache>>,
}

impl Stage {
    pub(crate) fn new(id: StageId, operation: Box<dyn Operation>) -> Self {
        Self {
            id,
            operation,
            result: None,
            views: Vec::new(),
            previous: None,
            next: None,
            status: StageStatus::Invalid,
            last_error: None,
            channel_cache: RefCell::new(None),
        }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.operation.name()
    }

    pub fn operation(&self) -> &dyn Operation {
        self.operation.as_ref()
    }

    /// The last computed result; only trustworthy while the stage is valid
    pub fn result(&self) -> Option<&Arc<Experiment>> {
        self.result.as_ref().map(|r| &r.experiment)
    }

    pub fn result_version(&self) -> Option<u64> {
        self.result.as_ref().map(|r| r.version)
    }

    pub fn views(&self) -> &[ViewDescriptor] {
        &self.views
    }

    pub fn previous(&self) -> Option<StageId> {
        self.previous
    }

    pub fn next(&self) -> Option<StageId> {
        self.next
    }

    pub fn status(&self) -> StageStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn cached_channels(&self, key: ChannelKey) -> Option<Vec<String>> {
        self.channel_cache
            .borrow()
            .as_ref()
            .filter(|cache| cache.key == key)
            .map(|cache| cache.channels.clone())
    }

    pub(crate) fn store_channels(&self, key: ChannelKey, channels: Vec<String>) {
        *self.channel_cache.borrow_mut() = Some(ChannelCache { key, channels });
    }
}

/// Read-only view of a stage for display
#[derive(Debug, Clone, Serialize)]
pub struct StageSnapshot {
    pub id: StageId,
    pub name: String,
    pub kind: String,
    pub operation_id: Uuid,
    pub status: StageStatus,
    pub channels: Vec<String>,
    pub events: usize,
    pub available_channels: Vec<String>,
    pub views: Vec<ViewDescriptor>,
    pub last_error: Option<String>,
}
