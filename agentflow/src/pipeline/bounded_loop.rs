//! Bounded producer/evaluator loop.
//!
//! A `BoundedLoop` repeats a producer stage and an evaluator stage against a
//! working copy of the context. The evaluator ends the loop early by
//! returning `StageResult::Satisfied`; otherwise the loop stops after
//! `max_iterations` rounds. Running out of iterations is not an error.

use super::merge_owned;
use crate::context::{Context, ContextDelta, StageContext};
use crate::core::{Interruption, LoopOutcome, StageError, StageResult};
use crate::errors::{ContractErrorInfo, PipelineValidationError};
use crate::events;
use crate::stages::Stage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Progress of a running loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopState {
    /// Completed producer runs.
    pub iteration: u32,
    /// Upper bound on producer runs.
    pub max_iterations: u32,
    /// Set when the evaluator signalled satisfaction.
    pub terminated_early: bool,
}

impl LoopState {
    /// Creates the state of a loop that has not run yet.
    #[must_use]
    pub fn new(max_iterations: u32) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            terminated_early: false,
        }
    }

    /// Returns true while another round may run.
    #[must_use]
    pub fn should_continue(&self) -> bool {
        !self.terminated_early && self.iteration < self.max_iterations
    }

    /// Returns the terminal outcome for the current state.
    #[must_use]
    pub fn outcome(&self) -> LoopOutcome {
        if self.terminated_early {
            LoopOutcome::SatisfiedEarly {
                iterations: self.iteration,
            }
        } else {
            LoopOutcome::ExhaustedIterations {
                iterations: self.iteration,
            }
        }
    }
}

/// A loop that ran to its end.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRun {
    /// How the loop ended.
    pub outcome: LoopOutcome,
    /// Everything the producer and evaluator wrote, last write per key.
    pub delta: ContextDelta,
}

/// A loop cut short by a sub-stage.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("loop {cause}")]
pub struct LoopInterrupted {
    /// What stopped the loop.
    pub cause: Interruption,
    /// Writes made before the stop, last write per key.
    pub delta: ContextDelta,
}

/// A producer/evaluator pair repeated at most `max_iterations` times.
#[derive(Debug)]
pub struct BoundedLoop {
    name: String,
    producer: Arc<dyn Stage>,
    evaluator: Arc<dyn Stage>,
    max_iterations: u32,
    owned_keys: BTreeSet<String>,
}

impl BoundedLoop {
    /// Creates a bounded loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the producer and evaluator share a name or an
    /// owned key.
    pub fn new(
        name: impl Into<String>,
        producer: Arc<dyn Stage>,
        evaluator: Arc<dyn Stage>,
        max_iterations: u32,
    ) -> Result<Self, PipelineValidationError> {
        let name = name.into();

        if producer.name() == evaluator.name() {
            return Err(PipelineValidationError::new(format!(
                "Loop '{}' uses stage name '{}' twice",
                name,
                producer.name()
            ))
            .with_stages(vec![producer.name().to_string()])
            .with_error_info(ContractErrorInfo::new(
                "CONTRACT-002-DUPLICATE_STAGE",
                "Producer and evaluator need distinct names",
            )));
        }

        if let Some(key) = producer
            .owned_keys()
            .intersection(evaluator.owned_keys())
            .next()
        {
            return Err(PipelineValidationError::new(format!(
                "Loop '{name}': key '{key}' is owned by both producer and evaluator"
            ))
            .with_stages(vec![
                producer.name().to_string(),
                evaluator.name().to_string(),
            ])
            .with_error_info(
                ContractErrorInfo::new(
                    "CONTRACT-003-KEY_OWNERSHIP",
                    format!("Key '{key}' has two owners"),
                )
                .with_context_entry("key", key.clone()),
            ));
        }

        let owned_keys = producer
            .owned_keys()
            .union(evaluator.owned_keys())
            .cloned()
            .collect();

        Ok(Self {
            name,
            producer,
            evaluator,
            max_iterations,
            owned_keys,
        })
    }

    /// Returns the iteration bound.
    #[must_use]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Runs the loop to its end against a working copy of `ctx`'s data.
    ///
    /// The producer sees the number of completed rounds as its iteration;
    /// the evaluator sees the count including the producer run it judges.
    ///
    /// # Errors
    ///
    /// Returns `LoopInterrupted` if a sub-stage halts or fails, carrying
    /// the writes of the sub-stage runs before it. A producer that signals
    /// satisfaction is a contract violation.
    pub async fn run_loop(&self, ctx: &StageContext<'_>) -> Result<LoopRun, LoopInterrupted> {
        let mut working = ctx.data().clone();
        let mut state = LoopState::new(self.max_iterations);

        while state.should_continue() {
            let produced = {
                let view = ctx
                    .child(&working, self.producer.name())
                    .with_iteration(state.iteration);
                self.producer.run(&view).await
            };
            if let StageResult::Satisfied = produced {
                let cause = self.failed(
                    self.producer.as_ref(),
                    StageError::contract_violation(format!(
                        "producer '{}' cannot signal loop satisfaction",
                        self.producer.name()
                    )),
                );
                return Err(interrupted(ctx, &working, cause));
            }
            if let Err(cause) = self.apply(self.producer.as_ref(), &mut working, produced) {
                return Err(interrupted(ctx, &working, cause));
            }
            state.iteration += 1;

            let evaluated = {
                let view = ctx
                    .child(&working, self.evaluator.name())
                    .with_iteration(state.iteration);
                self.evaluator.run(&view).await
            };
            if let StageResult::Satisfied = evaluated {
                state.terminated_early = true;
                debug!(stage = %ctx.stage_path(), iteration = state.iteration, "Evaluator satisfied");
            } else if let Err(cause) = self.apply(self.evaluator.as_ref(), &mut working, evaluated) {
                return Err(interrupted(ctx, &working, cause));
            }

            ctx.emit(
                events::LOOP_ITERATION,
                Some(json!({
                    "iteration": state.iteration,
                    "max_iterations": state.max_iterations,
                })),
            );
        }

        let outcome = state.outcome();
        let event_type = if outcome.is_satisfied() {
            events::LOOP_SATISFIED
        } else {
            events::LOOP_EXHAUSTED
        };
        ctx.emit(
            event_type,
            Some(json!({ "iterations": outcome.iterations(), "outcome": outcome })),
        );
        info!(
            stage = %ctx.stage_path(),
            iterations = outcome.iterations(),
            outcome = %outcome,
            "Loop finished"
        );

        Ok(LoopRun {
            outcome,
            delta: working.changes_since(ctx.data()),
        })
    }

    fn apply(
        &self,
        stage: &dyn Stage,
        working: &mut Context,
        result: StageResult,
    ) -> Result<(), Interruption> {
        match result {
            StageResult::Continue(delta) => self.merge(stage, working, delta),
            StageResult::Halt(reason) => Err(Interruption::Halted {
                stage: self.path(stage.name()),
                reason,
            }),
            StageResult::Fail(err) => Err(self.failed(stage, err)),
            StageResult::Interrupted { delta, cause } => {
                self.merge(stage, working, delta)?;
                Err(match cause {
                    Interruption::Halted {
                        stage: origin,
                        reason,
                    } => Interruption::Halted {
                        stage: self.path(&origin),
                        reason,
                    },
                    Interruption::Failed(err) => self.failed(stage, err),
                })
            }
            StageResult::Satisfied => Ok(()),
        }
    }

    fn merge(
        &self,
        stage: &dyn Stage,
        working: &mut Context,
        delta: ContextDelta,
    ) -> Result<(), Interruption> {
        merge_owned(stage, working, delta)
            .map(|_| ())
            .map_err(|err| self.failed(stage, err))
    }

    fn failed(&self, stage: &dyn Stage, err: StageError) -> Interruption {
        Interruption::Failed(err.within(&self.name, stage.name()))
    }

    fn path(&self, origin: &str) -> String {
        format!("{}/{origin}", self.name)
    }
}

fn interrupted(ctx: &StageContext<'_>, working: &Context, cause: Interruption) -> LoopInterrupted {
    debug!(stage = %ctx.stage_path(), cause = %cause, "Loop interrupted");
    LoopInterrupted {
        delta: working.changes_since(ctx.data()),
        cause,
    }
}

#[async_trait]
impl Stage for BoundedLoop {
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        match self.run_loop(ctx).await {
            Ok(run) => StageResult::Continue(run.delta),
            Err(LoopInterrupted { cause, delta }) => StageResult::interrupted(delta, cause),
        }
    }
}
