//! Error types for the agentflow framework.
//!
//! Stage-level failures travel as values (`StageResult::Fail`); this module
//! holds the errors that leave the orchestrator: the aggregated pipeline
//! failure, build-time contract violations, and the ambient config/session
//! errors.

use crate::core::StageErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for agentflow operations.
#[derive(Debug, Error)]
pub enum AgentflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// A stage failed while a pipeline was running.
    #[error("{0}")]
    Pipeline(#[from] PipelineFailure),

    /// A context write broke key ownership.
    #[error("{0}")]
    Ownership(#[from] KeyOwnershipError),

    /// A session store operation failed.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-003-KEY_OWNERSHIP").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    ///
    /// Known codes start with the hint from [`ContractSuggestions`].
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            fix_hint: ContractSuggestions::get(&code).map(String::from),
            code,
            summary: summary.into(),
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the contract code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// The single aggregated failure a pipeline reports to its caller.
///
/// Names the offending stage (as a `/`-separated path for nested composites)
/// and carries the underlying cause.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("stage '{stage}' failed ({kind}): {cause}")]
pub struct PipelineFailure {
    /// Path of the stage that failed.
    pub stage: String,
    /// What kind of failure it was.
    pub kind: StageErrorKind,
    /// The underlying cause.
    pub cause: String,
}

impl PipelineFailure {
    /// Creates a new pipeline failure.
    #[must_use]
    pub fn new(stage: impl Into<String>, kind: StageErrorKind, cause: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            kind,
            cause: cause.into(),
        }
    }

    /// Returns true if the failure came from a collaborator call.
    #[must_use]
    pub fn is_collaborator_failure(&self) -> bool {
        self.kind == StageErrorKind::Collaborator
    }

    /// Returns true if the failure is a broken stage contract.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        self.kind == StageErrorKind::ContractViolation
    }
}

/// Error raised when a writer touches a context key owned by someone else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("key '{key}' is owned by '{owner}' and cannot be written by '{writer}'")]
pub struct KeyOwnershipError {
    /// The contested key.
    pub key: String,
    /// The current owner of the key.
    pub owner: String,
    /// The writer that attempted the write.
    pub writer: String,
}

impl KeyOwnershipError {
    /// Creates a new ownership error.
    #[must_use]
    pub fn new(key: impl Into<String>, owner: impl Into<String>, writer: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            owner: owner.into(),
            writer: writer.into(),
        }
    }
}

/// Errors raised by session stores.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// No session with the given id exists.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// A session with the given id already exists.
    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    /// The backing store failed.
    #[error("Session store error: {0}")]
    Backend(String),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value outside its allowed range.
    #[error("Invalid config value for '{field}': {message}")]
    Invalid {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Provides default suggestions for common contract error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "CONTRACT-001-EMPTY" => Some("Add at least one stage to the pipeline before building."),
            "CONTRACT-002-DUPLICATE_STAGE" => Some(
                "Stage names identify failures and records. Give every stage in a pipeline a distinct name.",
            ),
            "CONTRACT-003-KEY_OWNERSHIP" => Some(
                "Each context key has exactly one writer. Move the key to a single stage \
                 or split it into two keys.",
            ),
            "CONTRACT-004-SEED_KEY" => Some(
                "Seed keys are written from the inbound message. Stages may read them but not own them.",
            ),
            _ => None,
        }
    }
}
