//! Test assertions for stage results and pipeline runs.

use crate::core::{PipelineStatus, StageErrorKind, StageResult};
use crate::pipeline::PipelineRun;

/// Asserts that a stage result continues and writes `key`.
pub fn assert_continued_with(result: &StageResult, key: &str) {
    match result {
        StageResult::Continue(delta) => assert!(
            delta.get(key).is_some(),
            "Expected delta to contain key '{}', keys: {:?}",
            key,
            delta.keys().collect::<Vec<_>>()
        ),
        other => panic!("Expected Continue writing '{key}', got {other:?}"),
    }
}

/// Asserts that a pipeline run completed.
pub fn assert_completed(run: &PipelineRun) {
    assert!(
        run.status.is_completed(),
        "Expected completed pipeline, got {:?}",
        run.status
    );
}

/// Asserts that a pipeline run failed at `stage` with `kind`.
pub fn assert_failed_at(run: &PipelineRun, stage: &str, kind: StageErrorKind) {
    match &run.status {
        PipelineStatus::Failed(failure) => {
            assert_eq!(failure.stage, stage, "Failure names the wrong stage");
            assert_eq!(failure.kind, kind, "Failure has the wrong kind");
        }
        other => panic!("Expected failure at '{stage}', got {other:?}"),
    }
}

/// Asserts that a pipeline run was halted by `stage`.
pub fn assert_halted_by(run: &PipelineRun, stage: &str) {
    match &run.status {
        PipelineStatus::Halted { stage: halted_by, .. } => {
            assert_eq!(halted_by, stage, "Halt came from the wrong stage");
        }
        other => panic!("Expected halt by '{stage}', got {other:?}"),
    }
}
