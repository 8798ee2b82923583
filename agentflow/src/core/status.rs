//! Pipeline and loop status enums.

use crate::errors::PipelineFailure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The terminal status of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every stage ran.
    Completed,
    /// A stage asked to stop; not an error.
    Halted {
        /// The stage that halted.
        stage: String,
        /// Why it halted.
        reason: String,
    },
    /// A stage failed.
    Failed(PipelineFailure),
}

impl PipelineStatus {
    /// Creates a halted status.
    #[must_use]
    pub fn halted(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Halted {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if every stage ran.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if a stage halted the pipeline.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted { .. })
    }

    /// Returns true if a stage failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Short label used in logs and events.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Halted { .. } => "halted",
            Self::Failed(_) => "failed",
        }
    }
}

/// How a bounded loop finished. Neither variant is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The evaluator signalled satisfaction.
    SatisfiedEarly {
        /// Producer runs performed.
        iterations: u32,
    },
    /// The iteration budget ran out without satisfaction.
    ExhaustedIterations {
        /// Producer runs performed.
        iterations: u32,
    },
}

impl LoopOutcome {
    /// Number of producer runs performed.
    #[must_use]
    pub fn iterations(&self) -> u32 {
        match self {
            Self::SatisfiedEarly { iterations } | Self::ExhaustedIterations { iterations } => {
                *iterations
            }
        }
    }

    /// Returns true if the loop ended on a satisfied signal.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::SatisfiedEarly { .. })
    }
}

impl fmt::Display for LoopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SatisfiedEarly { .. } => write!(f, "satisfied_early"),
            Self::ExhaustedIterations { .. } => write!(f, "exhausted_iterations"),
        }
    }
}
