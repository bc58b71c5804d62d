//! In-memory session storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use dealflow_core::auth::{is_session_expired, Result, Session, SessionId, SessionRepository};

/// In-memory session store for development and testing.
///
/// Sessions live in a HashMap wrapped in `Arc<RwLock<_>>`. Data is not
/// persisted and is lost when the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    /// Creates a new empty in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.as_str().to_string(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id.as_str()).cloned())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id.as_str());
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !is_session_expired(s, now));
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_session(id: &str, user_id: Uuid) -> Session {
        Session {
            id: SessionId::new(id.to_string()),
            user_id,
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn test_session_create_and_get() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let session = create_test_session("session-1", user_id);

        store.create_session(&session).await.unwrap();

        let retrieved = store
            .get_session(&SessionId::new("session-1".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved.id.as_str(), "session-1");
        assert_eq!(retrieved.user_id, user_id);
    }

    #[tokio::test]
    async fn test_session_get_nonexistent() {
        let store = InMemorySessionStore::new();

        let result = store
            .get_session(&SessionId::new("nonexistent".to_string()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_session_delete() {
        let store = InMemorySessionStore::new();
        let session = create_test_session("session-1", Uuid::new_v4());

        store.create_session(&session).await.unwrap();
        store.delete_session(&session.id).await.unwrap();

        assert!(store.get_session(&session.id).await.unwrap().is_none());

        // Deleting again is not an error
        assert!(store.delete_session(&session.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_user_sessions() {
        let store = InMemorySessionStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store
            .create_session(&create_test_session("session-1", alice))
            .await
            .unwrap();
        store
            .create_session(&create_test_session("session-2", alice))
            .await
            .unwrap();
        store
            .create_session(&create_test_session("session-3", bob))
            .await
            .unwrap();

        store.delete_user_sessions(alice).await.unwrap();

        for id in ["session-1", "session-2"] {
            assert!(store
                .get_session(&SessionId::new(id.to_string()))
                .await
                .unwrap()
                .is_none());
        }
        assert!(store
            .get_session(&SessionId::new("session-3".to_string()))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let mut stale = create_test_session("stale", Uuid::new_v4());
        stale.expires_at = now - Duration::minutes(1);
        let fresh = create_test_session("fresh", Uuid::new_v4());

        store.create_session(&stale).await.unwrap();
        store.create_session(&fresh).await.unwrap();

        assert_eq!(store.delete_expired_sessions(now).await.unwrap(), 1);
        assert!(store.get_session(&stale.id).await.unwrap().is_none());
        assert!(store.get_session(&fresh.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let store = InMemorySessionStore::new();
        let clone = store.clone();

        let session = create_test_session("session-1", Uuid::new_v4());
        store.create_session(&session).await.unwrap();

        assert!(clone.get_session(&session.id).await.unwrap().is_some());
    }
}
