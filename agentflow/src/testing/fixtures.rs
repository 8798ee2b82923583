//! Test fixtures for stage testing.

use crate::context::{keys, Context, RunIdentity, StageContext};
use crate::events::CollectingEventSink;

/// Owns the context, run identity and event sink a `StageContext` borrows,
/// so a single stage can be run in isolation.
#[derive(Debug, Default)]
pub struct StageHarness {
    /// The context the stage will read.
    pub context: Context,
    /// Run identity handed to the stage.
    pub run: RunIdentity,
    /// Collects anything the stage emits.
    pub events: CollectingEventSink,
}

impl StageHarness {
    /// Creates a harness around an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a harness whose context is seeded with `input_text`.
    #[must_use]
    pub fn with_input(text: impl Into<String>) -> Self {
        Self {
            context: Context::from_input_text(text),
            ..Self::default()
        }
    }

    /// Adds a value as if an earlier stage named `owner` wrote it.
    #[must_use]
    pub fn with_value(mut self, owner: &str, key: &str, value: serde_json::Value) -> Self {
        self.context
            .write(owner, key, value)
            .unwrap_or_else(|err| panic!("harness write failed: {err}"));
        self
    }

    /// Seeds the document path.
    #[must_use]
    pub fn with_pdf_path(mut self, path: impl Into<String>) -> Self {
        self.context
            .seed(keys::PDF_PATH, serde_json::Value::String(path.into()))
            .unwrap_or_else(|err| panic!("harness seed failed: {err}"));
        self
    }

    /// Builds the view for a stage named `stage_name`.
    #[must_use]
    pub fn ctx(&self, stage_name: &str) -> StageContext<'_> {
        StageContext::new(&self.context, stage_name, &self.run, &self.events)
    }
}
