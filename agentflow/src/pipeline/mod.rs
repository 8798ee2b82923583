//! Pipeline building and execution.
//!
//! This module provides:
//! - A validating pipeline builder (unique names, disjoint key ownership)
//! - The sequential orchestrator
//! - The bounded producer/evaluator loop composite

mod bounded_loop;
mod builder;
mod sequential;

pub use bounded_loop::{BoundedLoop, LoopInterrupted, LoopRun, LoopState};
pub use builder::PipelineBuilder;
pub use sequential::{Pipeline, PipelineRun};

use crate::context::{Context, ContextDelta};
use crate::core::StageError;
use crate::stages::Stage;

/// Merges a stage's writes after checking them against its owned keys.
///
/// Writing a key outside the stage's declared set, or a key another writer
/// already owns in `context`, is a contract violation and nothing is merged.
pub(crate) fn merge_owned(
    stage: &dyn Stage,
    context: &mut Context,
    delta: ContextDelta,
) -> Result<Vec<String>, StageError> {
    if let Some(key) = delta.keys().find(|key| !stage.owned_keys().contains(*key)) {
        return Err(StageError::contract_violation(format!(
            "stage '{}' wrote key '{}' it does not own",
            stage.name(),
            key
        )));
    }

    context
        .merge(stage.name(), delta)
        .map_err(|err| StageError::contract_violation(err.to_string()))
}
