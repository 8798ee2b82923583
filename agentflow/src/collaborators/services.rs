//! Weather, clock and search collaborators.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Looks up current weather for a city.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Returns a short description of the weather in `city`.
    async fn current_weather(&self, city: &str) -> anyhow::Result<String>;
}

/// Looks up the local time in a city.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClockService: Send + Sync {
    /// Returns the local time in `city`.
    async fn current_time(&self, city: &str) -> anyhow::Result<String>;
}

/// Search results for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    /// The query that was run.
    pub query: String,
    /// Result snippets, best first.
    pub results: Vec<String>,
}

/// Runs web searches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Searches for `query`.
    async fn search(&self, query: &str) -> anyhow::Result<SearchResults>;
}

/// Weather service that always reports the same conditions.
#[derive(Debug, Clone)]
pub struct FixedWeatherService {
    conditions: String,
}

impl FixedWeatherService {
    /// Reports `conditions` for every city.
    #[must_use]
    pub fn new(conditions: impl Into<String>) -> Self {
        Self {
            conditions: conditions.into(),
        }
    }
}

impl Default for FixedWeatherService {
    fn default() -> Self {
        Self::new("Sunny")
    }
}

#[async_trait]
impl WeatherService for FixedWeatherService {
    async fn current_weather(&self, _city: &str) -> anyhow::Result<String> {
        Ok(self.conditions.clone())
    }
}

/// Clock that always reports the same time.
#[derive(Debug, Clone)]
pub struct FixedClockService {
    time: String,
}

impl FixedClockService {
    /// Reports `time` for every city.
    #[must_use]
    pub fn new(time: impl Into<String>) -> Self {
        Self { time: time.into() }
    }
}

impl Default for FixedClockService {
    fn default() -> Self {
        Self::new("10:30 AM")
    }
}

#[async_trait]
impl ClockService for FixedClockService {
    async fn current_time(&self, _city: &str) -> anyhow::Result<String> {
        Ok(self.time.clone())
    }
}

/// Search provider that returns the same snippets for every query.
#[derive(Debug, Clone)]
pub struct FixedSearchProvider {
    results: Vec<String>,
}

impl FixedSearchProvider {
    /// Returns `results` for every query.
    #[must_use]
    pub fn new<I, S>(results: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            results: results.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for FixedSearchProvider {
    fn default() -> Self {
        Self::new(["Result 1", "Result 2"])
    }
}

#[async_trait]
impl SearchProvider for FixedSearchProvider {
    async fn search(&self, query: &str) -> anyhow::Result<SearchResults> {
        Ok(SearchResults {
            query: query.to_string(),
            results: self.results.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_services() {
        assert_eq!(
            FixedWeatherService::default().current_weather("Paris").await.unwrap(),
            "Sunny"
        );
        assert_eq!(
            FixedClockService::default().current_time("Paris").await.unwrap(),
            "10:30 AM"
        );
    }

    #[tokio::test]
    async fn test_fixed_search_echoes_query() {
        let results = FixedSearchProvider::default().search("rust loops").await.unwrap();

        assert_eq!(
            results,
            SearchResults {
                query: "rust loops".to_string(),
                results: vec!["Result 1".to_string(), "Result 2".to_string()],
            }
        );
    }
}
