//! Operation contract and parameter container

use crate::core::experiment::Experiment;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by an operation while computing its result
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("Missing parameter '{name}'")]
    MissingParameter { name: String },

    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Operation requires an input experiment")]
    MissingInput,

    #[error("Unknown channel '{0}'")]
    UnknownChannel(String),

    #[error("Channel '{channel}' has {found} events, expected {expected}")]
    LengthMismatch {
        channel: String,
        expected: usize,
        found: usize,
    },

    #[error("Channel '{0}' appears more than once")]
    DuplicateChannel(String),

    #[error("Failed to parse experiment: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Computation(String),
}

/// The transformation a stage applies to its upstream experiment
///
/// `validate` is the operation's own readiness check: returning `false`
/// means "not ready yet" and is never reported as an error. `apply` may
/// fail with an [`OperationError`], which the workflow reports to its
/// event handlers.
pub trait Operation: Send + fmt::Debug {
    /// Stable identity of this operation instance
    fn id(&self) -> Uuid;

    /// Operation type, e.g. "threshold"
    fn kind(&self) -> &str;

    /// Human-readable name, used for display only
    fn name(&self) -> &str;

    fn parameters(&self) -> &Parameters;

    fn parameters_mut(&mut self) -> &mut Parameters;

    /// Check whether the operation can run against `input`
    fn validate(&self, input: Option<&Experiment>) -> bool;

    /// Compute the result for `input`
    fn apply(&self, input: Option<&Experiment>) -> Result<Experiment, OperationError>;
}

/// Named operation parameters
///
/// Every effective change bumps the revision; the workflow compares
/// revisions to decide whether a stage has to run its update cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: BTreeMap<String, Value>,
    revision: u64,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, returning `true` if the stored value changed
    pub fn set<V: Into<Value>>(&mut self, key: &str, value: V) -> bool {
        let value = value.into();
        if self.values.get(key) == Some(&value) {
            return false;
        }
        self.values.insert(key.to_string(), value);
        self.revision += 1;
        true
    }

    /// Remove a parameter, returning `true` if it was present
    pub fn remove(&mut self, key: &str) -> bool {
        if self.values.remove(key).is_some() {
            self.revision += 1;
            true
        } else {
            false
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Number of effective changes since creation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Required string parameter
    pub fn str(&self, key: &str) -> Result<&str, OperationError> {
        match self.values.get(key) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(OperationError::InvalidParameter {
                name: key.to_string(),
                message: format!("expected a string, got {}", other),
            }),
            None => Err(OperationError::MissingParameter {
                name: key.to_string(),
            }),
        }
    }

    /// Required numeric parameter
    pub fn f64(&self, key: &str) -> Result<f64, OperationError> {
        match self.values.get(key) {
            Some(value) => value.as_f64().ok_or_else(|| OperationError::InvalidParameter {
                name: key.to_string(),
                message: format!("expected a number, got {}", value),
            }),
            None => Err(OperationError::MissingParameter {
                name: key.to_string(),
            }),
        }
    }
}

impl From<BTreeMap<String, Value>> for Parameters {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self {
            values,
            revision: 0,
        }
    }
}
