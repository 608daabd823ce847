//! workflow - a reactive chain of analysis stages

pub mod cli;
pub mod core;
pub mod execution;
pub mod operations;

// Re-export commonly used types
pub use crate::core::{Experiment, Operation, OperationError, Parameters};
pub use crate::core::{Stage, StageId, StageStatus, UpdateReport, Workflow, WorkflowError};
pub use crate::execution::{SharedWorkflow, WorkflowEvent};
