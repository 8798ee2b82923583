//! Per-stage execution records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a stage invocation led to, from the orchestrator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
    /// The stage's writes were merged.
    Continued,
    /// The stage halted the pipeline.
    Halted,
    /// The stage failed.
    Failed,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continued => write!(f, "continued"),
            Self::Halted => write!(f, "halted"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Record of one stage invocation inside a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage name.
    pub name: String,
    /// Outcome of the invocation.
    pub outcome: StageOutcome,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
    /// Keys merged into the context, sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys_written: Vec<String>,
    /// Halt reason or failure cause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageRecord {
    /// Creates a record for a stage whose writes were merged.
    #[must_use]
    pub fn continued(name: impl Into<String>, started_at: DateTime<Utc>, keys_written: Vec<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StageOutcome::Continued,
            started_at,
            ended_at: Utc::now(),
            keys_written,
            detail: None,
        }
    }

    /// Creates a record for a stage that halted.
    #[must_use]
    pub fn halted(name: impl Into<String>, started_at: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StageOutcome::Halted,
            started_at,
            ended_at: Utc::now(),
            keys_written: Vec::new(),
            detail: Some(reason.into()),
        }
    }

    /// Creates a record for a stage that failed.
    #[must_use]
    pub fn failed(name: impl Into<String>, started_at: DateTime<Utc>, cause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StageOutcome::Failed,
            started_at,
            ended_at: Utc::now(),
            keys_written: Vec::new(),
            detail: Some(cause.into()),
        }
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        (self.ended_at - self.started_at).num_microseconds().unwrap_or(0) as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continued_record() {
        let started = Utc::now();
        let record = StageRecord::continued("CityExtractorAgent", started, vec!["city".to_string()]);

        assert_eq!(record.name, "CityExtractorAgent");
        assert_eq!(record.outcome, StageOutcome::Continued);
        assert_eq!(record.keys_written, vec!["city".to_string()]);
        assert!(record.detail.is_none());
    }

    #[test]
    fn test_failed_record() {
        let record = StageRecord::failed("search", Utc::now(), "timeout");
        assert_eq!(record.outcome, StageOutcome::Failed);
        assert_eq!(record.detail.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_record_duration() {
        let started = Utc::now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let record = StageRecord::halted("pdf", started, "no pdf");

        assert!(record.duration_ms() >= 10.0);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(StageOutcome::Continued.to_string(), "continued");
        assert_eq!(StageOutcome::Halted.to_string(), "halted");
        assert_eq!(StageOutcome::Failed.to_string(), "failed");
    }
}
