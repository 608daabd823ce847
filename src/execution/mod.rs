//! Reactive update engine

pub mod engine;
pub mod events;
pub mod shared;

pub use events::{error_sink, EventHandler, WorkflowEvent};
pub use shared::SharedWorkflow;
