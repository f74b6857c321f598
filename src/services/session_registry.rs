//! Per-session workflow state.
//!
//! Each session owns one `WorkflowState` behind its own lock, so turns in
//! one session are serialized while separate sessions proceed concurrently.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::WorkflowState;

/// Identifier of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Use `id` as given.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrowed form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Lock-guarded state of one session.
pub type SharedState = Arc<Mutex<WorkflowState>>;

/// Map of session id to workflow state.
///
/// The map lock is held only to look up or insert a session; turns lock the
/// session's own mutex.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SharedState>>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `id`, created empty on first use.
    pub async fn get_or_create(&self, id: &SessionId) -> SharedState {
        if let Some(state) = self.sessions.read().await.get(id) {
            return state.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(session = %id, "session created");
                Arc::new(Mutex::new(WorkflowState::new()))
            })
            .clone()
    }

    /// Clear the session's state. Returns false when the session is unknown.
    pub async fn reset(&self, id: &SessionId) -> bool {
        let state = self.sessions.read().await.get(id).cloned();
        match state {
            Some(state) => {
                state.lock().await.reset();
                debug!(session = %id, "session reset");
                true
            }
            None => false,
        }
    }

    /// Drop the session. Returns whether it existed.
    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session exists.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Copy of the session's current state, if it exists.
    pub async fn snapshot(&self, id: &SessionId) -> Option<WorkflowState> {
        let state = self.sessions.read().await.get(id).cloned()?;
        let guard = state.lock().await;
        Some(guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{InsightContextEntry, InsightResponse};

    fn entry(question: &str) -> InsightContextEntry {
        InsightContextEntry::new(
            question,
            InsightResponse {
                query_plan: None,
                sql: Some("SELECT 1".to_string()),
                answer: "1".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_state() {
        let registry = SessionRegistry::new();
        let id = SessionId::from("a");

        registry.get_or_create(&id).await.lock().await.record_insight(entry("q"));
        let again = registry.get_or_create(&id).await;

        assert_eq!(again.lock().await.insight_context.len(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_reset_and_remove() {
        let registry = SessionRegistry::new();
        let id = SessionId::generate();
        registry.get_or_create(&id).await.lock().await.record_insight(entry("q"));

        assert!(registry.reset(&id).await);
        assert!(registry.snapshot(&id).await.unwrap().insight_context.is_empty());

        assert!(registry.remove(&id).await);
        assert!(!registry.reset(&id).await);
        assert!(registry.snapshot(&id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_under_concurrency() {
        let registry = Arc::new(SessionRegistry::new());
        let mut handles = Vec::new();
        for n in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let id = SessionId::new(format!("session-{}", n % 2));
                let state = registry.get_or_create(&id).await;
                state.lock().await.record_insight(entry(&format!("q{n}")));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.len().await, 2);
        for id in ["session-0", "session-1"] {
            let snapshot = registry.snapshot(&SessionId::from(id)).await.unwrap();
            assert_eq!(snapshot.insight_context.len(), 4);
        }
    }
}
