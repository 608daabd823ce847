//! Scenario-based tests for reactive workflows


mod cascade;
mod gating;
mod shared;
mod structure;
