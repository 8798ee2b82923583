//! Event sink system for observability.
//!
//! Pipelines and loops report their lifecycle through an `EventSink`
//! injected at build time. There is no process-wide sink: each pipeline owns
//! the sink it was built with (a `NoOpEventSink` unless configured).

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A pipeline run started.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Every stage of a pipeline ran.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// A stage halted the pipeline.
pub const PIPELINE_HALTED: &str = "pipeline.halted";
/// A stage failed the pipeline.
pub const PIPELINE_FAILED: &str = "pipeline.failed";

/// A stage is about to run.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage's writes were merged.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage halted.
pub const STAGE_HALTED: &str = "stage.halted";
/// A stage failed.
pub const STAGE_FAILED: &str = "stage.failed";

/// A bounded loop finished one producer/evaluator round.
pub const LOOP_ITERATION: &str = "loop.iteration";
/// A bounded loop exited on a satisfied signal.
pub const LOOP_SATISFIED: &str = "loop.satisfied";
/// A bounded loop ran out of iterations.
pub const LOOP_EXHAUSTED: &str = "loop.exhausted";
