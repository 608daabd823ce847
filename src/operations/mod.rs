//! Built-in operations
//!
//! The engine does not care what an operation does; these exist so a
//! workflow definition can be run end to end.

pub mod import;
pub mod log;
pub mod select;
pub mod threshold;

pub use import::ImportOp;
pub use log::LogOp;
pub use select::SelectOp;
pub use threshold::ThresholdOp;

use crate::core::{Operation, OperationError, Parameters};

/// Operation kinds understood by [`build`]
pub const KINDS: &[&str] = &["import", "threshold", "select", "log"];

/// Check whether an operation kind is known
pub fn is_known(kind: &str) -> bool {
    KINDS.contains(&kind)
}

/// Build an operation from its kind, display name and parameters
pub fn build(
    kind: &str,
    name: &str,
    parameters: Parameters,
) -> Result<Box<dyn Operation>, OperationError> {
    let operation: Box<dyn Operation> = match kind {
        "import" => Box::new(ImportOp::from_parameters(name, parameters)),
        "threshold" => Box::new(ThresholdOp::from_parameters(name, parameters)),
        "select" => Box::new(SelectOp::from_parameters(name, parameters)),
        "log" => Box::new(LogOp::from_parameters(name, parameters)),
        other => {
            return Err(OperationError::InvalidParameter {
                name: "operation".to_string(),
                message: format!("unknown operation kind '{}'", other),
            })
        }
    };
    Ok(operation)
}
