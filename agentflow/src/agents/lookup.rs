//! Weather and local-time lookups for the extracted city.

use crate::collaborators::{ClockService, WeatherService};
use crate::context::{keys, ContextDelta, StageContext};
use crate::core::StageResult;
use crate::stages::{owned, Stage};
use anyhow::Context as _;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Writes the weather in `city` to `weather`.
pub struct WeatherFetcherAgent {
    service: Arc<dyn WeatherService>,
    owned_keys: BTreeSet<String>,
}

impl WeatherFetcherAgent {
    /// Creates the agent.
    #[must_use]
    pub fn new(service: Arc<dyn WeatherService>) -> Self {
        Self {
            service,
            owned_keys: owned([keys::WEATHER]),
        }
    }

    async fn fetch(&self, ctx: &StageContext<'_>) -> anyhow::Result<ContextDelta> {
        let city = ctx.require_str(keys::CITY)?;
        let weather = self
            .service
            .current_weather(city)
            .await
            .with_context(|| format!("weather lookup for {city} failed"))?;
        Ok(ContextDelta::new().with(keys::WEATHER, json!(weather)))
    }
}

#[async_trait]
impl Stage for WeatherFetcherAgent {
    fn name(&self) -> &str {
        super::WEATHER_FETCHER
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        StageResult::from_collaborator(self.fetch(ctx).await)
    }
}

impl std::fmt::Debug for WeatherFetcherAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherFetcherAgent").finish_non_exhaustive()
    }
}

/// Writes the local time in `city` to `time`.
pub struct TimeFetcherAgent {
    clock: Arc<dyn ClockService>,
    owned_keys: BTreeSet<String>,
}

impl TimeFetcherAgent {
    /// Creates the agent.
    #[must_use]
    pub fn new(clock: Arc<dyn ClockService>) -> Self {
        Self {
            clock,
            owned_keys: owned([keys::TIME]),
        }
    }

    async fn fetch(&self, ctx: &StageContext<'_>) -> anyhow::Result<ContextDelta> {
        let city = ctx.require_str(keys::CITY)?;
        let time = self
            .clock
            .current_time(city)
            .await
            .with_context(|| format!("time lookup for {city} failed"))?;
        Ok(ContextDelta::new().with(keys::TIME, json!(time)))
    }
}

#[async_trait]
impl Stage for TimeFetcherAgent {
    fn name(&self) -> &str {
        super::TIME_FETCHER
    }

    fn owned_keys(&self) -> &BTreeSet<String> {
        &self.owned_keys
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        StageResult::from_collaborator(self.fetch(ctx).await)
    }
}

impl std::fmt::Debug for TimeFetcherAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeFetcherAgent").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FixedClockService, MockWeatherService};
    use crate::testing::StageHarness;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_weather_for_city() {
        let mut service = MockWeatherService::new();
        service
            .expect_current_weather()
            .with(eq("Paris"))
            .returning(|_| Ok("Sunny".to_string()));
        let agent = WeatherFetcherAgent::new(Arc::new(service));
        let harness = StageHarness::new().with_value("CityExtractorAgent", keys::CITY, json!("Paris"));

        let result = agent.run(&harness.ctx(agent.name())).await;

        assert_eq!(result.delta().and_then(|d| d.get(keys::WEATHER)), Some(&json!("Sunny")));
    }

    #[tokio::test]
    async fn test_weather_error_carries_cause() {
        let mut service = MockWeatherService::new();
        service
            .expect_current_weather()
            .returning(|_| Err(anyhow::anyhow!("network unreachable")));
        let agent = WeatherFetcherAgent::new(Arc::new(service));
        let harness = StageHarness::new().with_value("CityExtractorAgent", keys::CITY, json!("Paris"));

        match agent.run(&harness.ctx(agent.name())).await {
            StageResult::Fail(err) => {
                assert_eq!(err.message, "weather lookup for Paris failed: network unreachable");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_city_fails() {
        let agent = TimeFetcherAgent::new(Arc::new(FixedClockService::default()));
        let harness = StageHarness::with_input("no city here");

        assert!(agent.run(&harness.ctx(agent.name())).await.is_failure());
    }

    #[tokio::test]
    async fn test_time_for_city() {
        let agent = TimeFetcherAgent::new(Arc::new(FixedClockService::default()));
        let harness = StageHarness::new().with_value("CityExtractorAgent", keys::CITY, json!("Paris"));

        let result = agent.run(&harness.ctx(agent.name())).await;

        assert_eq!(result.delta().and_then(|d| d.get(keys::TIME)), Some(&json!("10:30 AM")));
    }
}
