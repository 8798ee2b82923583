//! City extraction.

use crate::collaborators::LanguageModel;
use crate::context::{keys, ContextDelta, StageContext};
use crate::core::StageResult;
use crate::stages::{owned, Stage};
use anyhow::{ensure, Context as _};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Instruction sent with the inbound text.
pub const CITY_INSTRUCTION: &str = "Extract the city name. Output ONLY the city.";

/// Asks the model for the city named in `input_text` and writes it to `city`.
#[derive(Clone)]
pub struct CityExtractorAgent {
    model: Arc<dyn LanguageModel>,
    owned_keys: BTreeSet<String>,
}

impl CityExtractorAgent {
    /// Creates the agent.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            owned_keys: owned([keys::CITY]),
        }
    }

    async fn extract(&self, ctx: &StageContext<'_>) -> anyhow::Result<ContextDelta> {
        let text = ctx.require_str(keys::INPUT_TEXT)?;
        let answer = self
            .model
            .complete(CITY_INSTRUCTION, text)
            .await
            .context("city extraction failed")?;
        let city = answer.trim();
        ensure!(!city.is_empty(), "model returned no city");

        Ok(ContextDelta::new().with(keys::CITY, json!(city)))
    }
}

#[async_trait]
impl Stage for CityExtractorAgent {
    fn name(&self) -> &str {
        super::CITY_EXTRACTOR
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        StageResult::from_collaborator(self.extract(ctx).await)
    }
}

impl std::fmt::Debug for CityExtractorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CityExtractorAgent").finish_non_exhaustive()
    }
}
