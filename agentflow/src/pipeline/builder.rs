//! Pipeline builder with validation.

use super::Pipeline;
use crate::context::keys;
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events::{EventSink, NoOpEventSink};
use crate::stages::Stage;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Builder for creating validated pipelines.
///
/// Validation happens as stages are added: stage names must be unique, no
/// two stages may own the same key, and no stage may own a seed key.
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// Stages in execution order.
    stages: Vec<Arc<dyn Stage>>,
    /// Owner of every key claimed so far.
    key_owners: BTreeMap<String, String>,
    /// Keys written from the inbound message.
    seed_keys: BTreeSet<String>,
    /// Sink for lifecycle events.
    events: Option<Arc<dyn EventSink>>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder with the default seed keys.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            key_owners: BTreeMap::new(),
            seed_keys: keys::SEED_KEYS.iter().map(|k| (*k).to_string()).collect(),
            events: None,
        }
    }

    /// Replaces the seed keys.
    ///
    /// Call this before adding stages; stages already added are not
    /// re-validated.
    #[must_use]
    pub fn with_seed_keys<I, S>(mut self, seed_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_keys = seed_keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Appends a stage.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (duplicate name, shared key, seed key).
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Result<Self, PipelineValidationError> {
        self.add_stage(stage)?;
        Ok(self)
    }

    /// Appends a stage in place.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage(&mut self, stage: Arc<dyn Stage>) -> Result<(), PipelineValidationError> {
        let name = stage.name().to_string();

        if self.stages.iter().any(|s| s.name() == name) {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' is defined twice in pipeline '{}'",
                name, self.name
            ))
            .with_stages(vec![name.clone()])
            .with_error_info(
                ContractErrorInfo::new(
                    "CONTRACT-002-DUPLICATE_STAGE",
                    format!("Duplicate stage name '{name}'"),
                ),
            ));
        }

        for key in stage.owned_keys() {
            if self.seed_keys.contains(key) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{name}' claims seed key '{key}'"
                ))
                .with_stages(vec![name.clone()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "CONTRACT-004-SEED_KEY",
                        format!("Key '{key}' is written from the inbound message"),
                    )
                    .with_fix_hint("Read seed keys; write results under a key the stage owns.")
                    .with_context_entry("key", key.clone()),
                ));
            }

            if let Some(owner) = self.key_owners.get(key) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{name}' claims key '{key}' already owned by '{owner}'"
                ))
                .with_stages(vec![owner.clone(), name.clone()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "CONTRACT-003-KEY_OWNERSHIP",
                        format!("Key '{key}' has two owners"),
                    )
                    .with_context_entry("key", key.clone())
                    .with_context_entry("owner", owner.clone()),
                ));
            }
        }

        for key in stage.owned_keys() {
            self.key_owners.insert(key.clone(), name.clone());
        }
        self.stages.push(stage);

        Ok(())
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder has no stages.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Pipeline '{}' has no stages",
                self.name
            ))
            .with_error_info(
                ContractErrorInfo::new("CONTRACT-001-EMPTY", "Cannot build an empty pipeline"),
            ));
        }

        let owned_keys = self.key_owners.into_keys().collect();
        let events = self.events.unwrap_or_else(|| Arc::new(NoOpEventSink));

        Ok(Pipeline::new(self.name, self.stages, owned_keys, events))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("seed_keys", &self.seed_keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::keys;
    use crate::testing::{HaltingStage, StaticStage};
    use serde_json::json;

    fn stage(name: &str, key: &str) -> Arc<dyn Stage> {
        Arc::new(StaticStage::new(name, key, json!(name)))
    }

    #[test]
    fn test_builder_counts_stages() {
        let builder = PipelineBuilder::new("workflow")
            .stage(stage("city", keys::CITY))
            .unwrap()
            .stage(stage("weather", keys::WEATHER))
            .unwrap();

        assert_eq!(builder.name(), "workflow");
        assert_eq!(builder.stage_count(), 2);
    }

    #[test]
    fn test_duplicate_stage_name_rejected() {
        let err = PipelineBuilder::new("workflow")
            .stage(stage("city", keys::CITY))
            .unwrap()
            .stage(stage("city", keys::WEATHER))
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-002-DUPLICATE_STAGE"));
    }

    #[test]
    fn test_shared_key_rejected() {
        let err = PipelineBuilder::new("workflow")
            .stage(stage("city", keys::CITY))
            .unwrap()
            .stage(stage("city_again", keys::CITY))
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-003-KEY_OWNERSHIP"));
        assert_eq!(err.stages, vec!["city".to_string(), "city_again".to_string()]);
    }

    #[test]
    fn test_seed_key_rejected() {
        let err = PipelineBuilder::new("workflow")
            .stage(stage("rewrite", keys::INPUT_TEXT))
            .unwrap_err();

        assert_eq!(err.code(), Some("CONTRACT-004-SEED_KEY"));
    }

    #[test]
    fn test_custom_seed_keys() {
        let result = PipelineBuilder::new("workflow")
            .with_seed_keys(["prompt"])
            .stage(stage("rewrite", keys::INPUT_TEXT));

        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        let err = PipelineBuilder::new("empty").build().unwrap_err();
        assert_eq!(err.code(), Some("CONTRACT-001-EMPTY"));
    }

    #[test]
    fn test_build_collects_owned_keys() {
        let pipeline = PipelineBuilder::new("workflow")
            .stage(stage("city", keys::CITY))
            .unwrap()
            .stage(Arc::new(HaltingStage::new("stop", "done")))
            .unwrap()
            .stage(stage("weather", keys::WEATHER))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(pipeline.stage_count(), 3);
        assert_eq!(
            pipeline.owned_keys().iter().cloned().collect::<Vec<_>>(),
            vec![keys::CITY.to_string(), keys::WEATHER.to_string()]
        );
    }
}
