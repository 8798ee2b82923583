//! Run identity for tracking pipeline executions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a pipeline run with its correlation IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this pipeline run.
    pub pipeline_run_id: Uuid,

    /// The session the run belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// The user that sent the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// The application name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl RunIdentity {
    /// Creates a new run identity with a generated pipeline run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline_run_id: Uuid::new_v4(),
            session_id: None,
            user_id: None,
            app_name: None,
        }
    }

    /// Sets the session ID.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the user ID.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the application name.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Adds the correlation IDs to an event payload object.
    pub fn annotate(&self, payload: &mut serde_json::Map<String, serde_json::Value>) {
        payload.insert(
            "pipeline_run_id".to_string(),
            serde_json::json!(self.pipeline_run_id.to_string()),
        );
        if let Some(ref id) = self.session_id {
            payload.insert("session_id".to_string(), serde_json::json!(id));
        }
        if let Some(ref id) = self.user_id {
            payload.insert("user_id".to_string(), serde_json::json!(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_identity_new() {
        let a = RunIdentity::new();
        let b = RunIdentity::new();
        assert_ne!(a.pipeline_run_id, b.pipeline_run_id);
        assert!(a.session_id.is_none());
    }

    #[test]
    fn test_run_identity_builder() {
        let identity = RunIdentity::new()
            .with_user_id("default_user")
            .with_session_id("abc")
            .with_app_name("my_agent");

        assert_eq!(identity.user_id.as_deref(), Some("default_user"));
        assert_eq!(identity.session_id.as_deref(), Some("abc"));
        assert_eq!(identity.app_name.as_deref(), Some("my_agent"));
    }

    #[test]
    fn test_annotate_skips_missing_ids() {
        let identity = RunIdentity::new().with_session_id("s-1");
        let mut payload = serde_json::Map::new();
        identity.annotate(&mut payload);

        assert!(payload.contains_key("pipeline_run_id"));
        assert_eq!(payload.get("session_id"), Some(&serde_json::json!("s-1")));
        assert!(!payload.contains_key("user_id"));
    }

    #[test]
    fn test_run_identity_serialization() {
        let identity = RunIdentity::new().with_user_id("u");
        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: RunIdentity = serde_json::from_str(&json).unwrap();

        assert_eq!(identity, deserialized);
    }
}
