//! The read-only view handed to a running stage.

use super::{Context, RunIdentity};
use crate::events::EventSink;
use anyhow::anyhow;

/// The context for a single stage invocation.
///
/// Stages read the shared `Context` through this view and return their
/// writes as a `ContextDelta`; they never mutate the context directly.
pub struct StageContext<'a> {
    data: &'a Context,
    stage_path: String,
    run: &'a RunIdentity,
    events: &'a dyn EventSink,
    iteration: Option<u32>,
}

impl<'a> StageContext<'a> {
    /// Creates a new stage context.
    #[must_use]
    pub fn new(
        data: &'a Context,
        stage_path: impl Into<String>,
        run: &'a RunIdentity,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            data,
            stage_path: stage_path.into(),
            run,
            events,
            iteration: None,
        }
    }

    /// Creates the view for a sub-stage of a composite.
    ///
    /// The sub-stage sees `data` (usually the composite's working copy) and
    /// gets the path `<this path>/<name>`.
    #[must_use]
    pub fn child<'b>(&'b self, data: &'b Context, name: &str) -> StageContext<'b> {
        StageContext {
            data,
            stage_path: format!("{}/{}", self.stage_path, name),
            run: self.run,
            events: self.events,
            iteration: self.iteration,
        }
    }

    /// Sets the loop iteration visible to the stage.
    #[must_use]
    pub fn with_iteration(mut self, iteration: u32) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Returns the shared context.
    #[must_use]
    pub fn data(&self) -> &Context {
        self.data
    }

    /// Gets a value from the context.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a string value from the context.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get_str(key)
    }

    /// Gets a string value that an earlier stage must have written.
    ///
    /// # Errors
    ///
    /// Fails if the key is missing or not a string.
    pub fn require_str(&self, key: &str) -> anyhow::Result<&str> {
        self.data
            .get_str(key)
            .ok_or_else(|| anyhow!("context key '{key}' is missing or not a string"))
    }

    /// Returns the `/`-separated stage path.
    #[must_use]
    pub fn stage_path(&self) -> &str {
        &self.stage_path
    }

    /// Returns the run identity.
    #[must_use]
    pub fn run(&self) -> &RunIdentity {
        self.run
    }

    /// Returns the event sink.
    #[must_use]
    pub fn events(&self) -> &dyn EventSink {
        self.events
    }

    /// Completed producer runs of the enclosing loop, if inside one.
    #[must_use]
    pub fn iteration(&self) -> Option<u32> {
        self.iteration
    }

    /// Emits an event enriched with run correlation IDs and the stage path.
    pub fn emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            self.run.annotate(map);
            map.insert("stage".to_string(), serde_json::json!(&self.stage_path));
        }

        self.events.try_emit(event_type, Some(enriched));
    }
}

impl std::fmt::Debug for StageContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("stage_path", &self.stage_path)
            .field("pipeline_run_id", &self.run.pipeline_run_id)
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}
