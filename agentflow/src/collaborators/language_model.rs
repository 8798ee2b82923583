//! Language model collaborator.

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A text completion model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Completes `input` under `instruction`.
    async fn complete(&self, instruction: &str, input: &str) -> anyhow::Result<String>;
}

/// A deterministic model answering from regex rules.
///
/// Rules are tried in order against `"<instruction>\n<input>"`. The first
/// match wins and its response is expanded with the match's capture groups
/// (`$1`, `${name}`). With no match the default response is returned, or an
/// error if there is none.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    rules: Vec<(Regex, String)>,
    default_response: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    /// Creates a model with no rules and no default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn when(mut self, pattern: &str, response: impl Into<String>) -> anyhow::Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("invalid model rule pattern '{pattern}'"))?;
        self.rules.push((regex, response.into()));
        Ok(self)
    }

    /// Sets the response used when no rule matches.
    #[must_use]
    pub fn otherwise(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Returns the number of completions served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, instruction: &str, input: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = format!("{instruction}\n{input}");

        for (regex, response) in &self.rules {
            if let Some(caps) = regex.captures(&prompt) {
                let mut expanded = String::new();
                caps.expand(response, &mut expanded);
                return Ok(expanded);
            }
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => bail!("no scripted response for instruction '{instruction}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rule_expands_captures() {
        let model = ScriptedModel::new()
            .when(r"(?m)^([A-Z][a-z]+) is sunny", "$1")
            .unwrap();

        let city = model
            .complete("Extract the city name.", "Paris is sunny today.")
            .await
            .unwrap();

        assert_eq!(city, "Paris");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let model = ScriptedModel::new()
            .when("(?i)weather", "first")
            .unwrap()
            .when("(?i)paris", "second")
            .unwrap();

        let answer = model.complete("", "weather in Paris").await.unwrap();
        assert_eq!(answer, "first");
    }

    #[tokio::test]
    async fn test_default_and_missing_response() {
        let model = ScriptedModel::new().otherwise("exit_loop");
        assert_eq!(model.complete("judge", "results").await.unwrap(), "exit_loop");

        let silent = ScriptedModel::new();
        let err = silent.complete("judge", "results").await.unwrap_err();
        assert!(err.to_string().contains("judge"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ScriptedModel::new().when("(", "x").is_err());
    }
}
