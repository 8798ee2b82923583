//! Mock stages for testing.

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::context::{ContextDelta, StageContext};
use crate::core::StageResult;
use crate::stages::{owned, Stage};

/// A stage that always continues with the same writes.
#[derive(Debug)]
pub struct StaticStage {
    name: String,
    owned_keys: BTreeSet<String>,
    delta: ContextDelta,
    calls: AtomicUsize,
}

impl StaticStage {
    /// Creates a stage that owns and writes a single key.
    #[must_use]
    pub fn new(name: impl Into<String>, key: &str, value: serde_json::Value) -> Self {
        Self::writes(name, ContextDelta::new().with(key, value))
    }

    /// Creates a stage that owns and writes every key of `delta`.
    #[must_use]
    pub fn writes(name: impl Into<String>, delta: ContextDelta) -> Self {
        Self {
            name: name.into(),
            owned_keys: owned(delta.keys()),
            delta,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the stage ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage for StaticStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, _ctx: &StageContext<'_>) -> StageResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StageResult::continue_with(self.delta.clone())
    }
}

/// A stage that always fails with a collaborator error.
#[derive(Debug)]
pub struct FailingStage {
    name: String,
    owned_keys: BTreeSet<String>,
    error: String,
    calls: AtomicUsize,
}

impl FailingStage {
    /// Creates a failing stage that nominally owns `key`.
    #[must_use]
    pub fn new(name: impl Into<String>, key: &str, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owned_keys: owned([key]),
            error: error.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the stage ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, _ctx: &StageContext<'_>) -> StageResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StageResult::fail(&self.error)
    }
}

/// A stage that always halts.
#[derive(Debug)]
pub struct HaltingStage {
    name: String,
    owned_keys: BTreeSet<String>,
    reason: String,
}

impl HaltingStage {
    /// Creates a halting stage.
    #[must_use]
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owned_keys: BTreeSet::new(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Stage for HaltingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, _ctx: &StageContext<'_>) -> StageResult {
        StageResult::halt(&self.reason)
    }
}

/// A producer that writes `{"round": n}` to its key on its n-th call
/// (1-based) and counts its calls.
#[derive(Debug)]
pub struct CountingStage {
    name: String,
    key: String,
    owned_keys: BTreeSet<String>,
    calls: AtomicUsize,
}

impl CountingStage {
    /// Creates a counting stage owning `key`.
    #[must_use]
    pub fn new(name: impl Into<String>, key: &str) -> Self {
        Self {
            name: name.into(),
            key: key.to_string(),
            owned_keys: owned([key]),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the stage ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage for CountingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, _ctx: &StageContext<'_>) -> StageResult {
        let round = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        StageResult::value(&self.key, json!({ "round": round }))
    }
}

/// An evaluator that signals satisfaction when the loop's iteration counter
/// reaches a given value, and otherwise writes a refined query.
#[derive(Debug)]
pub struct ScriptedEvaluator {
    name: String,
    key: String,
    owned_keys: BTreeSet<String>,
    satisfied_at: Option<u32>,
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    /// An evaluator that is never satisfied.
    #[must_use]
    pub fn never(name: impl Into<String>, key: &str) -> Self {
        Self {
            name: name.into(),
            key: key.to_string(),
            owned_keys: owned([key]),
            satisfied_at: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// An evaluator satisfied once `iteration` producer runs have completed.
    #[must_use]
    pub fn satisfied_at(name: impl Into<String>, key: &str, iteration: u32) -> Self {
        Self {
            satisfied_at: Some(iteration),
            ..Self::never(name, key)
        }
    }

    /// Returns the number of times the evaluator ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stage for ScriptedEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let iteration = ctx.iteration().unwrap_or_default();
        if self.satisfied_at == Some(iteration) {
            return StageResult::Satisfied;
        }
        StageResult::value(&self.key, json!(format!("refined query #{iteration}")))
    }
}

/// A stage that writes a key it does not own.
#[derive(Debug)]
pub struct RogueStage {
    name: String,
    owned_keys: BTreeSet<String>,
    target: String,
}

impl RogueStage {
    /// Creates a stage that owns `own_key` but writes `target`.
    #[must_use]
    pub fn new(name: impl Into<String>, own_key: &str, target: &str) -> Self {
        Self {
            name: name.into(),
            owned_keys: owned([own_key]),
            target: target.to_string(),
        }
    }
}

#[async_trait]
impl Stage for RogueStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, _ctx: &StageContext<'_>) -> StageResult {
        StageResult::value(&self.target, json!("overwritten"))
    }
}
