//! External systems the agents depend on.
//!
//! Every collaborator is an async trait returning `anyhow::Result`; stages
//! turn those errors into `StageResult::Fail`. Fixed implementations stand in
//! for the real services so workflows run offline and deterministically.

mod document;
mod language_model;
mod services;

pub use document::{DocumentReader, TextFileReader};
pub use language_model::{LanguageModel, ScriptedModel};
pub use services::{
    ClockService, FixedClockService, FixedSearchProvider, FixedWeatherService, SearchProvider,
    SearchResults, WeatherService,
};

#[cfg(test)]
pub use document::MockDocumentReader;
#[cfg(test)]
pub use language_model::MockLanguageModel;
#[cfg(test)]
pub use services::{MockClockService, MockSearchProvider, MockWeatherService};

use std::sync::Arc;

/// The collaborators handed to the default workflow.
#[derive(Clone)]
pub struct Collaborators {
    /// Model used for extraction, evaluation and the final answer.
    pub model: Arc<dyn LanguageModel>,
    /// Weather lookup.
    pub weather: Arc<dyn WeatherService>,
    /// Local time lookup.
    pub clock: Arc<dyn ClockService>,
    /// Web search.
    pub search: Arc<dyn SearchProvider>,
    /// Attached document text extraction.
    pub documents: Arc<dyn DocumentReader>,
}

impl Collaborators {
    /// Uses `model` with the fixed weather, clock and search services and
    /// the plain-text document reader.
    #[must_use]
    pub fn offline(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            weather: Arc::new(FixedWeatherService::default()),
            clock: Arc::new(FixedClockService::default()),
            search: Arc::new(FixedSearchProvider::default()),
            documents: Arc::new(TextFileReader),
        }
    }

    /// Replaces the weather service.
    #[must_use]
    pub fn with_weather(mut self, weather: Arc<dyn WeatherService>) -> Self {
        self.weather = weather;
        self
    }

    /// Replaces the clock service.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockService>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the search provider.
    #[must_use]
    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = search;
        self
    }

    /// Replaces the document reader.
    #[must_use]
    pub fn with_documents(mut self, documents: Arc<dyn DocumentReader>) -> Self {
        self.documents = documents;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
