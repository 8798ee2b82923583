//! Testing utilities for agentflow pipelines.
//!
//! This module provides:
//! - Mock stages with call counting
//! - A harness that owns everything a `StageContext` borrows
//! - Assertions for stage results and pipeline runs

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_completed, assert_continued_with, assert_failed_at, assert_halted_by,
};
pub use fixtures::StageHarness;
pub use mocks::{
    CountingStage, FailingStage, HaltingStage, RogueStage, ScriptedEvaluator, StaticStage,
};
