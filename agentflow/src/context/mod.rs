//! Context management for pipeline execution.
//!
//! This module provides:
//! - The shared key/value `Context` with per-key ownership
//! - `ContextDelta`, the writes a stage asks the orchestrator to merge
//! - `StageContext`, the read-only view handed to a running stage
//! - Run identity for correlating events

#[cfg(test)]
mod context_tests;
mod identity;
pub mod keys;
mod stage_context;
mod store;

pub use identity::RunIdentity;
pub use stage_context::StageContext;
pub use store::{Context, ContextDelta};
