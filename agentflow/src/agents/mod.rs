//! The agents of the default workflow and the workflow itself.
//!
//! Each agent is a [`Stage`](crate::stages::Stage) wrapping one collaborator
//! call. [`default_workflow`] wires them in the order quiz, city, weather,
//! time, research loop, document, response.

mod city;
mod lookup;
mod pdf;
mod quiz;
mod research;
mod response;

pub use city::{CityExtractorAgent, CITY_INSTRUCTION};
pub use lookup::{TimeFetcherAgent, WeatherFetcherAgent};
pub use pdf::{PdfReaderAgent, DEFAULT_PDF_CHAR_LIMIT};
pub use quiz::{generate_quiz, Quiz, QuizGeneratorAgent, QuizQuestion, QUIZ_QUESTION_RANGE};
pub use research::{research_loop, EvaluatorAgent, SearchAgent, EVALUATOR_INSTRUCTION, EXIT_SIGNAL};
pub use response::{ResponseAgent, RESPONSE_INSTRUCTION};

use crate::collaborators::Collaborators;
use crate::config::AgentConfig;
use crate::errors::AgentflowError;
use crate::pipeline::{Pipeline, PipelineBuilder};
use std::sync::Arc;

/// Stage name of [`QuizGeneratorAgent`].
pub const QUIZ_GENERATOR: &str = "QuizGeneratorAgent";
/// Stage name of [`CityExtractorAgent`].
pub const CITY_EXTRACTOR: &str = "CityExtractorAgent";
/// Stage name of [`WeatherFetcherAgent`].
pub const WEATHER_FETCHER: &str = "WeatherFetcherAgent";
/// Stage name of [`TimeFetcherAgent`].
pub const TIME_FETCHER: &str = "TimeFetcherAgent";
/// Stage name of the research loop.
pub const RESEARCH_LOOP: &str = "ResearchLoop";
/// Stage name of [`SearchAgent`].
pub const SEARCH_AGENT: &str = "SearchAgent";
/// Stage name of [`EvaluatorAgent`].
pub const EVALUATOR_AGENT: &str = "EvaluatorAgent";
/// Stage name of [`PdfReaderAgent`].
pub const PDF_READER: &str = "PdfReaderAgent";
/// Stage name of [`ResponseAgent`].
pub const RESPONSE_AGENT: &str = "ResponseAgent";

/// Returns a builder holding every stage of the default workflow.
///
/// Callers can still attach an event sink before building.
///
/// # Errors
///
/// Returns an error if `config` is invalid or the stages fail validation.
pub fn workflow_builder(
    collaborators: &Collaborators,
    config: &AgentConfig,
) -> Result<PipelineBuilder, AgentflowError> {
    config.validate()?;

    let builder = PipelineBuilder::new(&config.app_name)
        .stage(Arc::new(QuizGeneratorAgent::new(config.quiz_questions)?))?
        .stage(Arc::new(CityExtractorAgent::new(collaborators.model.clone())))?
        .stage(Arc::new(WeatherFetcherAgent::new(collaborators.weather.clone())))?
        .stage(Arc::new(TimeFetcherAgent::new(collaborators.clock.clone())))?
        .stage(Arc::new(research_loop(
            collaborators.search.clone(),
            collaborators.model.clone(),
            config.max_iterations,
        )?))?
        .stage(Arc::new(PdfReaderAgent::new(
            collaborators.documents.clone(),
            config.pdf_char_limit,
        )))?
        .stage(Arc::new(ResponseAgent::new(collaborators.model.clone())))?;

    Ok(builder)
}

/// Builds the default seven-stage workflow.
///
/// # Errors
///
/// Returns an error if `config` is invalid or the stages fail validation.
pub fn default_workflow(
    collaborators: &Collaborators,
    config: &AgentConfig,
) -> Result<Pipeline, AgentflowError> {
    Ok(workflow_builder(collaborators, config)?.build()?)
}

#[cfg(test)]
mod workflow_tests;
