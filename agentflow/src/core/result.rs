//! The tagged result every stage returns.

use crate::context::ContextDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The kind of failure a stage reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// The stage's underlying collaborator call errored.
    Collaborator,
    /// The stage broke the stage contract (wrote an unowned key, misused a signal).
    ContractViolation,
}

impl fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collaborator => write!(f, "collaborator failure"),
            Self::ContractViolation => write!(f, "contract violation"),
        }
    }
}

/// A failure carried by `StageResult::Fail`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct StageError {
    /// What kind of failure this is.
    pub kind: StageErrorKind,
    /// Human readable cause.
    pub message: String,
    /// Path of the stage that originated the failure, when it is not the
    /// stage returning it (set by composites).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl StageError {
    /// Creates a collaborator failure.
    #[must_use]
    pub fn collaborator(message: impl Into<String>) -> Self {
        Self {
            kind: StageErrorKind::Collaborator,
            message: message.into(),
            stage: None,
        }
    }

    /// Creates a contract violation.
    #[must_use]
    pub fn contract_violation(message: impl Into<String>) -> Self {
        Self {
            kind: StageErrorKind::ContractViolation,
            message: message.into(),
            stage: None,
        }
    }

    /// Converts a collaborator error, keeping its whole context chain.
    #[must_use]
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self::collaborator(format!("{err:#}"))
    }

    /// Records the originating stage path.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Prefixes the origin with an enclosing composite's name.
    ///
    /// `leaf` is used when no origin was recorded yet.
    #[must_use]
    pub fn within(mut self, parent: &str, leaf: &str) -> Self {
        let origin = self.stage.take().unwrap_or_else(|| leaf.to_string());
        self.stage = Some(format!("{parent}/{origin}"));
        self
    }
}

/// Why a composite stage stopped before its sub-stages finished.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Interruption {
    /// A sub-stage halted.
    #[error("halted by '{stage}': {reason}")]
    Halted {
        /// Path of the halting sub-stage, e.g. `ResearchLoop/EvaluatorAgent`.
        stage: String,
        /// Halt reason.
        reason: String,
    },
    /// A sub-stage failed; the error's origin is the sub-stage path.
    #[error("failed: {0}")]
    Failed(StageError),
}

impl Interruption {
    /// Path of the sub-stage that stopped the composite.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::Halted { stage, .. } => Some(stage),
            Self::Failed(err) => err.stage.as_deref(),
        }
    }
}

/// The outcome of one stage invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult {
    /// Merge these writes into the context and go on.
    Continue(ContextDelta),
    /// Stop the pipeline normally; nothing more to do.
    Halt(String),
    /// The evaluator of a bounded loop is satisfied; leave the loop.
    Satisfied,
    /// Stop the pipeline with a failure.
    Fail(StageError),
    /// A composite stage stopped partway. `delta` holds what its sub-stages
    /// wrote before the stop; it is merged before the pipeline halts or
    /// fails.
    Interrupted {
        /// Writes made before the stop.
        delta: ContextDelta,
        /// What stopped the composite.
        cause: Interruption,
    },
}

impl StageResult {
    /// Continues with the given writes.
    #[must_use]
    pub fn continue_with(delta: ContextDelta) -> Self {
        Self::Continue(delta)
    }

    /// Continues without writing anything.
    #[must_use]
    pub fn pass() -> Self {
        Self::Continue(ContextDelta::new())
    }

    /// Continues with a single write.
    #[must_use]
    pub fn value(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self::Continue(ContextDelta::new().with(key, value))
    }

    /// Halts the pipeline with a reason.
    #[must_use]
    pub fn halt(reason: impl Into<String>) -> Self {
        Self::Halt(reason.into())
    }

    /// Fails with a collaborator error message.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(StageError::collaborator(message))
    }

    /// Fails with a contract violation.
    #[must_use]
    pub fn contract_violation(message: impl Into<String>) -> Self {
        Self::Fail(StageError::contract_violation(message))
    }

    /// Converts a collaborator result into a stage result.
    ///
    /// This is the single place where collaborator errors become values, so
    /// no raw error escapes a stage.
    #[must_use]
    pub fn from_collaborator(result: anyhow::Result<ContextDelta>) -> Self {
        match result {
            Ok(delta) => Self::Continue(delta),
            Err(err) => Self::Fail(StageError::from_anyhow(&err)),
        }
    }

    /// Returns true for `Continue`.
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    /// Stops a composite, keeping the writes made so far.
    #[must_use]
    pub fn interrupted(delta: ContextDelta, cause: Interruption) -> Self {
        Self::Interrupted { delta, cause }
    }

    /// Returns true for `Fail`, or an interruption caused by a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Fail(_)
                | Self::Interrupted {
                    cause: Interruption::Failed(_),
                    ..
                }
        )
    }

    /// Returns the delta of a `Continue`.
    #[must_use]
    pub fn delta(&self) -> Option<&ContextDelta> {
        match self {
            Self::Continue(delta) => Some(delta),
            _ => None,
        }
    }

    /// Short label used in logs and events.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Continue(_) => "continue",
            Self::Halt(_) => "halt",
            Self::Satisfied => "satisfied",
            Self::Fail(_) => "fail",
            Self::Interrupted { .. } => "interrupted",
        }
    }
}
