//! Stage trait and implementations.
//!
//! Stages are the fundamental units of work in an agentflow pipeline. Each
//! stage declares the context keys it owns and returns its writes as a
//! `StageResult`; the orchestrator does the merging.

use crate::context::{Context, StageContext};
use crate::core::StageResult;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;

/// Trait for pipeline stages.
///
/// A stage is a function of the context plus its own collaborator: it must
/// not depend on its position in the pipeline, and every collaborator error
/// must come back as `StageResult::Fail`.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage.
    fn name(&self) -> &str;

    /// Returns the context keys this stage may write.
    fn owned_keys(&self) -> &BTreeSet<String>;

    /// Runs the stage.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Read-only view of the shared context
    ///
    /// # Returns
    ///
    /// The writes to merge, or a halt/fail signal.
    async fn run(&self, ctx: &StageContext<'_>) -> StageResult;
}

/// Builds an owned-key set from string-like keys.
pub fn owned<I, S>(keys: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter().map(Into::into).collect()
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&StageContext<'_>) -> StageResult + Send + Sync,
{
    name: String,
    owned_keys: BTreeSet<String>,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&StageContext<'_>) -> StageResult + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new<I, S>(name: impl Into<String>, owned_keys: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            owned_keys: owned(owned_keys),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&StageContext<'_>) -> StageResult + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("owned_keys", &self.owned_keys)
            .finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&StageContext<'_>) -> StageResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        (self.func)(ctx)
    }
}

/// An async function-based stage.
///
/// The closure receives a copy of the context so its future can own it.
pub struct AsyncFnStage<F, Fut>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = StageResult> + Send,
{
    name: String,
    owned_keys: BTreeSet<String>,
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnStage<F, Fut>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = StageResult> + Send,
{
    /// Creates a new async function-based stage.
    pub fn new<I, S>(name: impl Into<String>, owned_keys: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            owned_keys: owned(owned_keys),
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Debug for AsyncFnStage<F, Fut>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = StageResult> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnStage")
            .field("name", &self.name)
            .field("owned_keys", &self.owned_keys)
            .finish()
    }
}

#[async_trait]
impl<F, Fut> Stage for AsyncFnStage<F, Fut>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = StageResult> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        (self.func)(ctx.data().clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::keys;
    use crate::testing::StageHarness;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_stage() {
        let stage = FnStage::new("city", [keys::CITY], |ctx: &StageContext<'_>| {
            let text = ctx.get_str(keys::INPUT_TEXT).unwrap_or_default();
            let city = text.split_whitespace().next().unwrap_or_default();
            StageResult::value(keys::CITY, json!(city))
        });

        assert_eq!(stage.name(), "city");
        assert!(stage.owned_keys().contains(keys::CITY));

        let harness = StageHarness::with_input("Paris is sunny today.");
        let result = stage.run(&harness.ctx("city")).await;
        assert_eq!(result.delta().and_then(|d| d.get(keys::CITY)), Some(&json!("Paris")));
    }

    #[tokio::test]
    async fn test_async_fn_stage() {
        let stage = AsyncFnStage::new("weather", [keys::WEATHER], |ctx: Context| async move {
            tokio::task::yield_now().await;
            match ctx.get_str(keys::CITY) {
                Some(_) => StageResult::value(keys::WEATHER, json!("Sunny")),
                None => StageResult::fail("city missing"),
            }
        });

        let harness = StageHarness::with_input("no city yet");
        let result = stage.run(&harness.ctx("weather")).await;
        assert!(result.is_failure());
    }

    #[test]
    fn test_owned_builds_sorted_set() {
        let set = owned(["b", "a", "b"]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["a".to_string(), "b".to_string()]);
    }
}
