//! Process-local session store.

use super::{Session, SessionStore};
use crate::errors::SessionError;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Session store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Session, SessionError> {
        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(_) => Err(SessionError::AlreadyExists(session_id.to_string())),
            Entry::Vacant(slot) => {
                let session = Session::new(session_id, app_name, user_id);
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.get(session_id).map(|s| s.value().clone()))
    }

    async fn save(&self, session: Session) -> Result<(), SessionError> {
        match self.sessions.get_mut(&session.id) {
            Some(mut slot) => {
                *slot = session;
                Ok(())
            }
            None => Err(SessionError::NotFound(session.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    #[tokio::test]
    async fn test_create_then_get() {
        let store = InMemorySessionStore::new();

        let created = store.create("my_agent", "default_user", "s-1").await.unwrap();
        let fetched = store.get("s-1").await.unwrap().unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.turns, 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let store = InMemorySessionStore::new();
        store.create("my_agent", "default_user", "s-1").await.unwrap();

        let err = store.create("my_agent", "default_user", "s-1").await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists(id) if id == "s-1"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemorySessionStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_records_turn() {
        let store = InMemorySessionStore::new();
        let mut session = store.create("my_agent", "default_user", "s-1").await.unwrap();

        session.record_turn(Context::from_input_text("hello"));
        store.save(session).await.unwrap();

        let stored = store.get("s-1").await.unwrap().unwrap();
        assert_eq!(stored.turns, 1);
        assert_eq!(
            stored.last_context.and_then(|c| c.get_str("input_text").map(String::from)),
            Some("hello".to_string())
        );
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn test_save_unknown_fails() {
        let store = InMemorySessionStore::new();
        let err = store
            .save(Session::new("ghost", "my_agent", "default_user"))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::NotFound(_)));
    }
}
