//! In-memory implementation of the `SessionStore` trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use loremaster_core::error::DomainError;
use loremaster_core::repository::{SessionStore, SharedSession};
use loremaster_core::session::GameSession;

/// Process-local store of live sessions.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is open.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: GameSession) -> Result<SharedSession, DomainError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(DomainError::Validation(format!(
                "session {} is already open",
                session.id
            )));
        }
        let session_id = session.id;
        let handle = Arc::new(RwLock::new(session));
        sessions.insert(session_id, Arc::clone(&handle));
        info!(%session_id, "session opened");
        Ok(handle)
    }

    async fn open(&self, session_id: Uuid) -> Result<SharedSession, DomainError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(DomainError::SessionNotFound(session_id))
    }

    async fn snapshot(&self, session_id: Uuid) -> Result<GameSession, DomainError> {
        let handle = self.open(session_id).await?;
        let session = handle.read().await.clone();
        debug!(%session_id, version = session.version, "session snapshot taken");
        Ok(session)
    }

    async fn remove(&self, session_id: Uuid) -> Result<GameSession, DomainError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?;
        info!(%session_id, "session closed");
        let session = handle.read().await.clone();
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use loremaster_core::error::DomainError;
    use loremaster_core::repository::SessionStore;
    use loremaster_test_support::fixtures;
    use uuid::Uuid;

    use super::InMemorySessionStore;

    #[tokio::test]
    async fn test_snapshot_reflects_mutation_through_handle() {
        // Arrange
        let store = InMemorySessionStore::new();
        let session = fixtures::ambush_session();
        let session_id = session.id;
        let handle = store.insert(session).await.unwrap();

        // Act
        {
            let mut live = handle.write().await;
            live.location = Some("Old Mill".to_owned());
            live.bump_version();
        }
        let snapshot = store.snapshot(session_id).await.unwrap();

        // Assert
        assert_eq!(snapshot.location.as_deref(), Some("Old Mill"));
        assert_eq!(snapshot.version, 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_session() {
        let store = InMemorySessionStore::new();
        let session = fixtures::ambush_session();
        store.insert(session.clone()).await.unwrap();

        let result = store.insert(session).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_open_unknown_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let session_id = Uuid::new_v4();

        let result = store.open(session_id).await;

        match result {
            Err(DomainError::SessionNotFound(id)) => assert_eq!(id, session_id),
            other => panic!("expected SessionNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remove_closes_session() {
        let store = InMemorySessionStore::new();
        let session = fixtures::ambush_session();
        let session_id = session.id;
        store.insert(session).await.unwrap();

        let removed = store.remove(session_id).await.unwrap();

        assert_eq!(removed.id, session_id);
        assert!(store.is_empty().await);
        assert!(store.snapshot(session_id).await.is_err());
    }
}
