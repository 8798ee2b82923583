//! Sequential pipeline execution.
//!
//! Stages run strictly in order. After each `Continue` the stage's writes
//! are checked against its owned keys and merged; the first `Halt` or `Fail`
//! ends the run and no later stage is invoked. A composite that stops partway
//! returns `Interrupted`: its partial writes are merged first, then the run
//! halts or fails with the sub-stage path as origin.

use super::merge_owned;
use crate::context::{Context, RunIdentity, StageContext};
use crate::core::{Interruption, PipelineStatus, StageError, StageRecord, StageResult};
use crate::errors::{AgentflowError, PipelineFailure};
use crate::events::{self, EventSink};
use crate::stages::Stage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// An ordered, validated list of stages.
///
/// Built with [`PipelineBuilder`](super::PipelineBuilder). A pipeline is
/// itself a [`Stage`], so pipelines nest.
pub struct Pipeline {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    owned_keys: BTreeSet<String>,
    events: Arc<dyn EventSink>,
}

/// The result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// The context after the last merged stage.
    pub context: Context,
    /// How the run ended.
    pub status: PipelineStatus,
    /// One record per invoked stage, in order.
    pub records: Vec<StageRecord>,
    /// Correlation IDs for the run.
    pub run: RunIdentity,
    /// Wall-clock time of the run in milliseconds.
    pub duration_ms: f64,
}

impl PipelineRun {
    /// Returns true if every stage ran.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Returns the failure, if the run failed.
    #[must_use]
    pub fn failure(&self) -> Option<&PipelineFailure> {
        self.status.failure()
    }

    /// Names of the stages that were invoked, in order.
    #[must_use]
    pub fn stages_run(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Converts the run into the final context.
    ///
    /// A halted run is not an error and yields its context.
    ///
    /// # Errors
    ///
    /// Returns `AgentflowError::Pipeline` if a stage failed.
    pub fn into_result(self) -> Result<Context, AgentflowError> {
        match self.status {
            PipelineStatus::Failed(failure) => Err(AgentflowError::Pipeline(failure)),
            PipelineStatus::Completed | PipelineStatus::Halted { .. } => Ok(self.context),
        }
    }
}

/// Where a pipeline is running: at the top of a run, or as a stage of an
/// enclosing composite.
#[derive(Clone, Copy)]
enum Scope<'s> {
    Root {
        run: &'s RunIdentity,
        events: &'s dyn EventSink,
    },
    Nested(&'s StageContext<'s>),
}

impl<'s> Scope<'s> {
    fn view<'c>(&'c self, data: &'c Context, name: &str) -> StageContext<'c> {
        match self {
            Self::Root { run, events } => StageContext::new(data, name, *run, *events),
            Self::Nested(parent) => parent.child(data, name),
        }
    }
}

impl Pipeline {
    pub(crate) fn new(
        name: String,
        stages: Vec<Arc<dyn Stage>>,
        owned_keys: BTreeSet<String>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            name,
            stages,
            owned_keys,
            events,
        }
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

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Returns the union of the stages' owned keys.
    #[must_use]
    pub fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    /// Runs the pipeline under a fresh run identity.
    pub async fn run(&self, context: Context) -> PipelineRun {
        self.run_with_identity(context, RunIdentity::new()).await
    }

    /// Runs the pipeline under the given run identity.
    pub async fn run_with_identity(&self, mut context: Context, run: RunIdentity) -> PipelineRun {
        let start = Instant::now();
        info!(
            pipeline = %self.name,
            run_id = %run.pipeline_run_id,
            stages = self.stages.len(),
            "Pipeline started"
        );
        self.emit(&run, events::PIPELINE_STARTED, json!({ "stages": self.stage_names() }));

        let mut records = Vec::with_capacity(self.stages.len());
        let scope = Scope::Root {
            run: &run,
            events: self.events.as_ref(),
        };
        let status = self.drive(&mut context, scope, &mut records).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &status {
            PipelineStatus::Completed => {
                info!(pipeline = %self.name, duration_ms, "Pipeline completed");
                self.emit(&run, events::PIPELINE_COMPLETED, json!({ "duration_ms": duration_ms }));
            }
            PipelineStatus::Halted { stage, reason } => {
                info!(pipeline = %self.name, stage = %stage, reason = %reason, "Pipeline halted");
                self.emit(
                    &run,
                    events::PIPELINE_HALTED,
                    json!({ "stage": stage, "reason": reason, "duration_ms": duration_ms }),
                );
            }
            PipelineStatus::Failed(failure) => {
                warn!(pipeline = %self.name, error = %failure, "Pipeline failed");
                self.emit(
                    &run,
                    events::PIPELINE_FAILED,
                    json!({
                        "stage": &failure.stage,
                        "kind": failure.kind,
                        "error": &failure.cause,
                        "duration_ms": duration_ms,
                    }),
                );
            }
        }

        PipelineRun {
            context,
            status,
            records,
            run,
            duration_ms,
        }
    }

    async fn drive(
        &self,
        context: &mut Context,
        scope: Scope<'_>,
        records: &mut Vec<StageRecord>,
    ) -> PipelineStatus {
        for stage in &self.stages {
            let name = stage.name();
            let started_at = Utc::now();
            let stage_start = Instant::now();

            let result = {
                let view = scope.view(context, name);
                debug!(stage = %view.stage_path(), "Stage started");
                view.emit(events::STAGE_STARTED, None);
                stage.run(&view).await
            };
            let stage_duration_ms = stage_start.elapsed().as_secs_f64() * 1000.0;

            let err = match result {
                StageResult::Continue(delta) => match merge_owned(stage.as_ref(), context, delta) {
                    Ok(keys_written) => {
                        scope.view(context, name).emit(
                            events::STAGE_COMPLETED,
                            Some(json!({
                                "keys_written": &keys_written,
                                "duration_ms": stage_duration_ms,
                            })),
                        );
                        records.push(StageRecord::continued(name, started_at, keys_written));
                        continue;
                    }
                    Err(err) => err,
                },
                StageResult::Halt(reason) => {
                    let halt = Halt {
                        origin: name.to_string(),
                        reason,
                        started_at,
                    };
                    return halt.record(scope, context, name, records);
                }
                StageResult::Satisfied => StageError::contract_violation(format!(
                    "stage '{name}' signalled loop satisfaction outside a bounded loop"
                )),
                StageResult::Fail(err) => err,
                StageResult::Interrupted { delta, cause } => {
                    match merge_owned(stage.as_ref(), context, delta) {
                        Err(err) => err,
                        Ok(keys_kept) => {
                            debug!(stage = %name, keys = ?keys_kept, "Kept writes of interrupted stage");
                            match cause {
                                Interruption::Halted { stage: origin, reason } => {
                                    let halt = Halt {
                                        origin,
                                        reason,
                                        started_at,
                                    };
                                    return halt.record(scope, context, name, records);
                                }
                                Interruption::Failed(err) => err,
                            }
                        }
                    }
                }
            };

            let failure = PipelineFailure::new(
                err.stage.unwrap_or_else(|| name.to_string()),
                err.kind,
                err.message,
            );
            scope.view(context, name).emit(
                events::STAGE_FAILED,
                Some(json!({
                    "origin": &failure.stage,
                    "kind": failure.kind,
                    "error": &failure.cause,
                    "duration_ms": stage_duration_ms,
                })),
            );
            records.push(StageRecord::failed(name, started_at, &failure.cause));
            return PipelineStatus::Failed(failure);
        }

        PipelineStatus::Completed
    }

    fn emit(&self, run: &RunIdentity, event_type: &str, data: serde_json::Value) {
        let mut payload = data;
        if let serde_json::Value::Object(ref mut map) = payload {
            run.annotate(map);
            map.insert("pipeline".to_string(), json!(&self.name));
        }
        self.events.try_emit(event_type, Some(payload));
    }
}

#[async_trait]
impl Stage for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    /// Runs the inner stages on a working copy of the context and returns
    /// everything they wrote as one delta, also when an inner stage halts or
    /// fails.
    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        let mut working = ctx.data().clone();
        let mut records = Vec::with_capacity(self.stages.len());

        let status = self.drive(&mut working, Scope::Nested(ctx), &mut records).await;
        let delta = working.changes_since(ctx.data());
        let cause = match status {
            PipelineStatus::Completed => return StageResult::Continue(delta),
            PipelineStatus::Halted { stage, reason } => {
                debug!(pipeline = %self.name, stage = %stage, "Nested pipeline halted");
                Interruption::Halted {
                    stage: format!("{}/{stage}", self.name),
                    reason,
                }
            }
            PipelineStatus::Failed(failure) => Interruption::Failed(
                StageError {
                    kind: failure.kind,
                    message: failure.cause,
                    stage: None,
                }
                .within(&self.name, &failure.stage),
            ),
        };
        StageResult::interrupted(delta, cause)
    }
}

/// A halt on its way into the run's status.
struct Halt {
    origin: String,
    reason: String,
    started_at: DateTime<Utc>,
}

impl Halt {
    fn record(
        self,
        scope: Scope<'_>,
        context: &Context,
        name: &str,
        records: &mut Vec<StageRecord>,
    ) -> PipelineStatus {
        scope.view(context, name).emit(
            events::STAGE_HALTED,
            Some(json!({ "origin": &self.origin, "reason": &self.reason })),
        );
        records.push(StageRecord::halted(name, self.started_at, &self.reason));
        PipelineStatus::halted(self.origin, self.reason)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .field("owned_keys", &self.owned_keys)
            .finish_non_exhaustive()
    }
}
