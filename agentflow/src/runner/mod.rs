//! Message runner: sessions around a pipeline.
//!
//! The runner turns an inbound message into a seeded context, runs the
//! pipeline under the message's session and stores the result back.

use crate::config::AgentConfig;
use crate::context::{keys, Context, RunIdentity};
use crate::core::{PipelineStatus, StageRecord};
use crate::errors::{AgentflowError, SessionError};
use crate::pipeline::Pipeline;
use crate::session::{Session, SessionStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A validated message from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// The user's text.
    pub text: String,
    /// Path of an attached document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Conversation to continue; a new one is started when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl InboundMessage {
    /// Creates a message with text only.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Attaches a document.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Continues an existing session.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Builds the seed context for this message.
    ///
    /// # Errors
    ///
    /// Never fails on a fresh context; the error type comes from seeding.
    pub fn seed_context(&self) -> Result<Context, AgentflowError> {
        let mut context = Context::from_input_text(self.text.clone());
        if let Some(path) = &self.file_path {
            context.seed(keys::PDF_PATH, json!(path))?;
        }
        Ok(context)
    }
}

/// What a run reports back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    /// Session the run belonged to.
    pub session_id: String,
    /// Id of this pipeline run.
    pub pipeline_run_id: Uuid,
    /// How the run ended.
    pub status: PipelineStatus,
    /// The final context values.
    pub context: serde_json::Value,
    /// The answer, if the response stage ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_response: Option<String>,
    /// One record per invoked stage.
    pub records: Vec<StageRecord>,
    /// Wall-clock time of the run in milliseconds.
    pub duration_ms: f64,
}

/// Runs messages through a pipeline with session bookkeeping.
pub struct Runner {
    pipeline: Pipeline,
    sessions: Arc<dyn SessionStore>,
    config: AgentConfig,
}

impl Runner {
    /// Creates a runner.
    #[must_use]
    pub fn new(pipeline: Pipeline, sessions: Arc<dyn SessionStore>, config: AgentConfig) -> Self {
        Self {
            pipeline,
            sessions,
            config,
        }
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs one message.
    ///
    /// A failed pipeline is reported through `RunResponse::status`, and the
    /// partial context is still saved to the session.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session store fails.
    pub async fn run(&self, message: InboundMessage) -> Result<RunResponse, AgentflowError> {
        let session_id = message
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut session = self.get_or_create(&session_id).await?;

        let identity = RunIdentity::new()
            .with_session_id(&session_id)
            .with_user_id(&self.config.user_id)
            .with_app_name(&self.config.app_name);
        info!(
            session_id = %session_id,
            run_id = %identity.pipeline_run_id,
            model = %self.config.model,
            has_attachment = message.file_path.is_some(),
            "Running message"
        );

        let run = self
            .pipeline
            .run_with_identity(message.seed_context()?, identity)
            .await;

        session.record_turn(run.context.clone());
        self.sessions.save(session).await?;

        Ok(RunResponse {
            session_id,
            pipeline_run_id: run.run.pipeline_run_id,
            final_response: run.context.get_str(keys::FINAL_RESPONSE).map(String::from),
            context: run.context.to_json(),
            status: run.status,
            records: run.records,
            duration_ms: run.duration_ms,
        })
    }

    async fn get_or_create(&self, session_id: &str) -> Result<Session, SessionError> {
        if let Some(session) = self.sessions.get(session_id).await? {
            debug!(session_id, turns = session.turns, "Continuing session");
            return Ok(session);
        }

        match self
            .sessions
            .create(&self.config.app_name, &self.config.user_id, session_id)
            .await
        {
            Ok(session) => Ok(session),
            Err(SessionError::AlreadyExists(_)) => self
                .sessions
                .get(session_id)
                .await?
                .ok_or_else(|| SessionError::NotFound(session_id.to_string())),
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("pipeline", &self.pipeline)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::keys;
    use crate::pipeline::PipelineBuilder;
    use crate::session::{InMemorySessionStore, MockSessionStore};
    use crate::testing::{FailingStage, StaticStage};

    fn city_pipeline() -> Pipeline {
        PipelineBuilder::new("my_agent")
            .stage(Arc::new(StaticStage::new("CityExtractorAgent", keys::CITY, json!("Paris"))))
            .unwrap()
            .stage(Arc::new(StaticStage::new(
                "ResponseAgent",
                keys::FINAL_RESPONSE,
                json!("Hello from Paris."),
            )))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_seed_context() {
        let context = InboundMessage::new("summarize")
            .with_file_path("/tmp/notes.pdf")
            .seed_context()
            .unwrap();

        assert_eq!(context.get_str(keys::INPUT_TEXT), Some("summarize"));
        assert_eq!(context.get_str(keys::PDF_PATH), Some("/tmp/notes.pdf"));
        assert_eq!(context.owner_of(keys::PDF_PATH), Some(keys::INPUT_OWNER));
    }

    #[tokio::test]
    async fn test_new_session_is_created() {
        let store = Arc::new(InMemorySessionStore::new());
        let runner = Runner::new(city_pipeline(), store.clone(), AgentConfig::default());

        let response = runner.run(InboundMessage::new("hi")).await.unwrap();

        assert!(Uuid::parse_str(&response.session_id).is_ok());
        assert!(response.status.is_completed());
        assert_eq!(response.final_response.as_deref(), Some("Hello from Paris."));

        let session = store.get(&response.session_id).await.unwrap().unwrap();
        assert_eq!(session.turns, 1);
        assert_eq!(session.app_name, "my_agent");
        assert_eq!(session.user_id, "default_user");
    }

    #[tokio::test]
    async fn test_existing_session_is_continued() {
        let store = Arc::new(InMemorySessionStore::new());
        let runner = Runner::new(city_pipeline(), store.clone(), AgentConfig::default());

        runner
            .run(InboundMessage::new("first").with_session_id("s-1"))
            .await
            .unwrap();
        let response = runner
            .run(InboundMessage::new("second").with_session_id("s-1"))
            .await
            .unwrap();

        assert_eq!(response.session_id, "s-1");
        let session = store.get("s-1").await.unwrap().unwrap();
        assert_eq!(session.turns, 2);
        assert_eq!(
            session.last_context.unwrap().get_str(keys::INPUT_TEXT),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_failed_run_is_saved_and_reported() {
        let pipeline = PipelineBuilder::new("my_agent")
            .stage(Arc::new(FailingStage::new("WeatherFetcherAgent", keys::WEATHER, "timeout")))
            .unwrap()
            .build()
            .unwrap();
        let store = Arc::new(InMemorySessionStore::new());
        let runner = Runner::new(pipeline, store.clone(), AgentConfig::default());

        let response = runner
            .run(InboundMessage::new("weather?").with_session_id("s-2"))
            .await
            .unwrap();

        assert_eq!(response.status.failure().map(|f| f.stage.as_str()), Some("WeatherFetcherAgent"));
        assert!(response.final_response.is_none());
        assert_eq!(store.get("s-2").await.unwrap().unwrap().turns, 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error() {
        let mut store = MockSessionStore::new();
        store
            .expect_get()
            .returning(|_| Err(SessionError::Backend("disk full".to_string())));
        let runner = Runner::new(city_pipeline(), Arc::new(store), AgentConfig::default());

        let err = runner.run(InboundMessage::new("hi")).await.unwrap_err();

        assert!(matches!(err, AgentflowError::Session(SessionError::Backend(_))));
    }

    #[test]
    fn test_message_deserializes_without_optionals() {
        let message: InboundMessage = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(message, InboundMessage::new("hi"));
    }
}
