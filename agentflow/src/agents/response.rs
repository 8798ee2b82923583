//! Final answer composition.

use crate::collaborators::LanguageModel;
use crate::context::{keys, ContextDelta, StageContext};
use crate::core::StageResult;
use crate::stages::{owned, Stage};
use anyhow::{ensure, Context as _};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Instruction sent to the model.
pub const RESPONSE_INSTRUCTION: &str =
    "Answer the user in one polite sentence using only the facts below.";

/// Context keys offered to the model when present.
const FACT_KEYS: [&str; 6] = [
    keys::CITY,
    keys::TIME,
    keys::WEATHER,
    keys::SEARCH_RESULT,
    keys::PDF_TEXT,
    keys::QUIZ,
];

/// Writes one polite sentence built from the gathered facts to
/// `final_response`.
pub struct ResponseAgent {
    model: Arc<dyn LanguageModel>,
    owned_keys: BTreeSet<String>,
}

impl ResponseAgent {
    /// Creates the agent.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            owned_keys: owned([keys::FINAL_RESPONSE]),
        }
    }

    async fn respond(&self, ctx: &StageContext<'_>) -> anyhow::Result<ContextDelta> {
        let facts: serde_json::Map<String, serde_json::Value> = FACT_KEYS
            .iter()
            .filter_map(|key| ctx.get(key).map(|v| ((*key).to_string(), v.clone())))
            .collect();
        let input = json!({
            "request": ctx.get_str(keys::INPUT_TEXT).unwrap_or_default(),
            "facts": facts,
        });

        let answer = self
            .model
            .complete(RESPONSE_INSTRUCTION, &input.to_string())
            .await
            .context("response generation failed")?;
        let sentence = answer.trim();
        ensure!(!sentence.is_empty(), "model returned an empty response");

        Ok(ContextDelta::new().with(keys::FINAL_RESPONSE, json!(sentence)))
    }
}

#[async_trait]
impl Stage for ResponseAgent {
    fn name(&self) -> &str {
        super::RESPONSE_AGENT
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        StageResult::from_collaborator(self.respond(ctx).await)
    }
}

impl std::fmt::Debug for ResponseAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseAgent").finish_non_exhaustive()
    }
}
