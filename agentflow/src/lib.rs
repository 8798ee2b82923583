//! # Agentflow
//!
//! Sequential and bounded-loop orchestration of agent stages.
//!
//! Agentflow runs an ordered list of stages over a shared, ownership-checked
//! context:
//!
//! - **Stage contract**: a stage reads the context and returns a
//!   `StageResult` (continue with writes, halt, fail); it never mutates
//!   shared state directly
//! - **Key ownership**: each context key has exactly one writer, checked when
//!   the pipeline is built and again on every merge
//! - **Bounded loops**: a producer/evaluator pair repeated until the
//!   evaluator is satisfied or the iteration budget runs out
//! - **Agents**: quiz, city, weather, time, research, document and response
//!   stages over pluggable collaborators
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agentflow::prelude::*;
//!
//! let model = Arc::new(ScriptedModel::new().otherwise("Paris"));
//! let pipeline = default_workflow(&Collaborators::offline(model), &AgentConfig::default())?;
//!
//! let run = pipeline.run(Context::from_input_text("Paris is sunny today.")).await;
//! assert!(run.is_completed());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod agents;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod runner;
pub mod session;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agents::{default_workflow, workflow_builder};
    pub use crate::collaborators::{
        ClockService, Collaborators, DocumentReader, LanguageModel, ScriptedModel,
        SearchProvider, WeatherService,
    };
    pub use crate::config::AgentConfig;
    pub use crate::context::{keys, Context, ContextDelta, RunIdentity, StageContext};
    pub use crate::core::{
        Interruption, LoopOutcome, PipelineStatus, StageError, StageErrorKind, StageResult,
    };
    pub use crate::errors::{AgentflowError, PipelineFailure, PipelineValidationError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{BoundedLoop, Pipeline, PipelineBuilder, PipelineRun};
    pub use crate::runner::{InboundMessage, RunResponse, Runner};
    pub use crate::session::{InMemorySessionStore, Session, SessionStore};
    pub use crate::stages::{owned, AsyncFnStage, FnStage, Stage};
    pub use std::sync::Arc;
}
