//! Core domain model types for agentflow.
//!
//! This module contains the fundamental types used throughout the framework:
//! - The tagged `StageResult` every stage returns
//! - Pipeline and loop status enums
//! - Per-stage execution records

mod record;
mod result;
mod status;

pub use record::{StageOutcome, StageRecord};
pub use result::{Interruption, StageError, StageErrorKind, StageResult};
pub use status::{LoopOutcome, PipelineStatus};
