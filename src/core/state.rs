//! Stage status and update bookkeeping

use crate::core::stage::StageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validity of a single stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Result must not be trusted (also the initial state)
    #[default]
    Invalid,
    /// An update cycle is running on the stage
    Updating,
    /// Result reflects the current operation and upstream result
    Valid,
}

impl StageStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, StageStatus::Valid)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageStatus::Invalid => "invalid",
            StageStatus::Updating => "updating",
            StageStatus::Valid => "valid",
        };
        f.write_str(s)
    }
}

/// What a stage does when its operation fails to compute a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure, keep the previous result, still become valid
    /// and signal the successor
    #[default]
    KeepValid,
    /// Report the failure, become invalid and stop the cascade
    Invalidate,
}

/// A computation failure raised by a stage's operation
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: StageId,

    /// Display name of the failing operation
    pub operation: String,

    /// Human-readable message
    pub message: String,

    pub at: DateTime<Utc>,
}

/// Record of one triggered cascade
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    /// Stage that received the trigger
    pub trigger: StageId,

    /// Stages whose update cycle ran, in execution order
    pub cycles: Vec<StageId>,

    /// Stage whose validation rejected its input, stopping the cascade
    pub rejected: Option<StageId>,

    /// Computation failures raised during the cascade
    pub failures: Vec<StageFailure>,

    /// Stages forced to invalid by a neighbour's valid -> invalid transition
    pub invalidated: Vec<StageId>,
}

impl UpdateReport {
    pub fn new(trigger: StageId) -> Self {
        Self {
            trigger,
            cycles: Vec::new(),
            rejected: None,
            failures: Vec::new(),
            invalidated: Vec::new(),
        }
    }

    /// True when nothing was rejected and nothing failed
    pub fn is_clean(&self) -> bool {
        self.rejected.is_none() && self.failures.is_empty()
    }

    /// Fold another report into this one, keeping this report's trigger
    pub fn merge(&mut self, other: UpdateReport) {
        self.cycles.extend(other.cycles);
        if self.rejected.is_none() {
            self.rejected = other.rejected;
        }
        self.failures.extend(other.failures);
        self.invalidated.extend(other.invalidated);
    }
}
