//! The search/evaluate research loop.

use crate::collaborators::{LanguageModel, SearchProvider};
use crate::context::{keys, ContextDelta, StageContext};
use crate::core::{StageError, StageResult};
use crate::errors::PipelineValidationError;
use crate::pipeline::BoundedLoop;
use crate::stages::{owned, Stage};
use anyhow::Context as _;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Reply with which the evaluator ends the loop.
pub const EXIT_SIGNAL: &str = "exit_loop";

/// Instruction sent to the evaluator model.
pub const EVALUATOR_INSTRUCTION: &str = "Decide whether the search results answer the request. \
     Reply exit_loop if they do; otherwise reply with a better search query and nothing else.";

/// Searches for `search_query` (or `input_text` on the first round) and
/// writes `{query, results}` to `search_result`.
pub struct SearchAgent {
    provider: Arc<dyn SearchProvider>,
    owned_keys: BTreeSet<String>,
}

impl SearchAgent {
    /// Creates the agent.
    #[must_use]
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            owned_keys: owned([keys::SEARCH_RESULT]),
        }
    }

    async fn search(&self, ctx: &StageContext<'_>) -> anyhow::Result<ContextDelta> {
        let query = match ctx.get_str(keys::SEARCH_QUERY) {
            Some(query) => query,
            None => ctx.require_str(keys::INPUT_TEXT)?,
        };
        let results = self
            .provider
            .search(query)
            .await
            .with_context(|| format!("search for '{query}' failed"))?;

        Ok(ContextDelta::new().with(keys::SEARCH_RESULT, serde_json::to_value(results)?))
    }
}

#[async_trait]
impl Stage for SearchAgent {
    fn name(&self) -> &str {
        super::SEARCH_AGENT
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        StageResult::from_collaborator(self.search(ctx).await)
    }
}

impl std::fmt::Debug for SearchAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchAgent").finish_non_exhaustive()
    }
}

/// Judges the latest search results.
///
/// Returns `Satisfied` when the model answers `exit_loop`; otherwise writes
/// the model's refined query to `search_query`.
pub struct EvaluatorAgent {
    model: Arc<dyn LanguageModel>,
    owned_keys: BTreeSet<String>,
}

impl EvaluatorAgent {
    /// Creates the agent.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            owned_keys: owned([keys::SEARCH_QUERY]),
        }
    }

    async fn judge(&self, ctx: &StageContext<'_>) -> anyhow::Result<String> {
        let request = ctx.require_str(keys::INPUT_TEXT)?;
        let input = json!({
            "request": request,
            "search_result": ctx.get(keys::SEARCH_RESULT),
        });
        let reply = self
            .model
            .complete(EVALUATOR_INSTRUCTION, &input.to_string())
            .await
            .context("search evaluation failed")?;
        Ok(reply.trim().to_string())
    }
}

#[async_trait]
impl Stage for EvaluatorAgent {
    fn name(&self) -> &str {
        super::EVALUATOR_AGENT
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        match self.judge(ctx).await {
            Ok(reply) if reply.eq_ignore_ascii_case(EXIT_SIGNAL) => StageResult::Satisfied,
            Ok(reply) if reply.is_empty() => StageResult::fail("model returned an empty search query"),
            Ok(reply) => StageResult::value(keys::SEARCH_QUERY, json!(reply)),
            Err(err) => StageResult::Fail(StageError::from_anyhow(&err)),
        }
    }
}

impl std::fmt::Debug for EvaluatorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorAgent").finish_non_exhaustive()
    }
}

/// Builds the research loop: `SearchAgent` then `EvaluatorAgent`, at most
/// `max_iterations` times.
///
/// # Errors
///
/// Never fails for these two agents; the error comes from loop validation.
pub fn research_loop(
    provider: Arc<dyn SearchProvider>,
    model: Arc<dyn LanguageModel>,
    max_iterations: u32,
) -> Result<BoundedLoop, PipelineValidationError> {
    BoundedLoop::new(
        super::RESEARCH_LOOP,
        Arc::new(SearchAgent::new(provider)),
        Arc::new(EvaluatorAgent::new(model)),
        max_iterations,
    )
}
