//! Conversation sessions.
//!
//! A session remembers the last context produced for a conversation. The
//! store gives get and create-if-absent semantics only; concurrent runs on
//! one session are not serialized.

mod memory;

pub use memory::InMemorySessionStore;

use crate::context::Context;
use crate::errors::SessionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session id.
    pub id: String,
    /// Application the session belongs to.
    pub app_name: String,
    /// User that owns the session.
    pub user_id: String,
    /// Context produced by the most recent run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_context: Option<Context>,
    /// Number of completed runs.
    pub turns: u32,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last saved.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        app_name: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            app_name: app_name.into(),
            user_id: user_id.into(),
            last_context: None,
            turns: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stores the context of a finished run.
    pub fn record_turn(&mut self, context: Context) {
        self.last_context = Some(context);
        self.turns += 1;
        self.updated_at = Utc::now();
    }
}

/// Persistence for sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a new session.
    ///
    /// Fails with `SessionError::AlreadyExists` if the id is taken.
    async fn create(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Session, SessionError>;

    /// Returns the session, if it exists.
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError>;

    /// Replaces a stored session.
    ///
    /// Fails with `SessionError::NotFound` if it was never created.
    async fn save(&self, session: Session) -> Result<(), SessionError>;
}
