//! Workflow configuration.
//!
//! `AgentConfig` is loaded from a TOML file, overridden from `AGENTFLOW_*`
//! environment variables, and validated before a workflow is built.

use crate::agents::{DEFAULT_PDF_CHAR_LIMIT, QUIZ_QUESTION_RANGE};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Prefix of the environment variables read by [`AgentConfig::apply_env`].
pub const ENV_PREFIX: &str = "AGENTFLOW_";

fn default_app_name() -> String {
    "my_agent".to_string()
}

fn default_user_id() -> String {
    "default_user".to_string()
}

fn default_max_iterations() -> u32 {
    3
}

fn default_pdf_char_limit() -> usize {
    DEFAULT_PDF_CHAR_LIMIT
}

fn default_quiz_questions() -> usize {
    5
}

fn default_model() -> String {
    "scripted".to_string()
}

/// Settings for the default workflow and its runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Application name; also the pipeline name.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// User id recorded on sessions.
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Bound on research loop rounds.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Characters kept from an attached document.
    #[serde(default = "default_pdf_char_limit")]
    pub pdf_char_limit: usize,
    /// Questions per generated quiz.
    #[serde(default = "default_quiz_questions")]
    pub quiz_questions: usize,
    /// Name of the language model, reported in logs.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            user_id: default_user_id(),
            max_iterations: default_max_iterations(),
            pdf_char_limit: default_pdf_char_limit(),
            quiz_questions: default_quiz_questions(),
            model: default_model(),
        }
    }
}

impl AgentConfig {
    /// Parses a TOML document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML or mistyped fields.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Overrides fields from `AGENTFLOW_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a numeric variable does not parse.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    /// Overrides fields from a variable lookup keyed by the unprefixed,
    /// upper-case field name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a numeric variable does not parse.
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("APP_NAME") {
            self.app_name = value;
        }
        if let Some(value) = lookup("USER_ID") {
            self.user_id = value;
        }
        if let Some(value) = lookup("MODEL") {
            self.model = value;
        }
        if let Some(value) = lookup("MAX_ITERATIONS") {
            self.max_iterations = parse_number("max_iterations", &value)?;
        }
        if let Some(value) = lookup("PDF_CHAR_LIMIT") {
            self.pdf_char_limit = parse_number("pdf_char_limit", &value)?;
        }
        if let Some(value) = lookup("QUIZ_QUESTIONS") {
            self.quiz_questions = parse_number("quiz_questions", &value)?;
        }
        Ok(self)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::invalid("app_name", "must not be empty"));
        }
        if !QUIZ_QUESTION_RANGE.contains(&self.quiz_questions) {
            return Err(ConfigError::invalid(
                "quiz_questions",
                format!("must be between 1 and 10, got {}", self.quiz_questions),
            ));
        }
        if self.pdf_char_limit == 0 {
            return Err(ConfigError::invalid("pdf_char_limit", "must be greater than 0"));
        }
        Ok(())
    }

    /// Sets the application name.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Sets the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Sets the research loop bound.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the document character limit.
    #[must_use]
    pub fn with_pdf_char_limit(mut self, limit: usize) -> Self {
        self.pdf_char_limit = limit;
        self
    }

    /// Sets the number of quiz questions.
    #[must_use]
    pub fn with_quiz_questions(mut self, count: usize) -> Self {
        self.quiz_questions = count;
        self
    }

    /// Sets the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, format!("'{value}' is not a valid number")))
}
