//! Core domain models for workflows
//!
//! This module defines the experiment, the operation contract, stages and
//! the workflow container that links them into a chain.

pub mod config;
pub mod experiment;
pub mod operation;
pub mod stage;
pub mod state;
pub mod workflow;

pub use experiment::*;
pub use operation::*;
pub use stage::*;
pub use state::*;
pub use workflow::*;
