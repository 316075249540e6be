//! Session store abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::DomainError;
use crate::session::GameSession;

/// A live session shared between command handlers.
///
/// Handlers hold the write lock for the duration of one command, which keeps
/// each command's mutation atomic with respect to readers.
pub type SharedSession = Arc<RwLock<GameSession>>;

/// Store of live sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Registers a new live session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a session with the same id is
    /// already open.
    async fn insert(&self, session: GameSession) -> Result<SharedSession, DomainError>;

    /// Returns the live handle for a session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the session is not open.
    async fn open(&self, session_id: Uuid) -> Result<SharedSession, DomainError>;

    /// Returns a point-in-time copy of a session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the session is not open.
    async fn snapshot(&self, session_id: Uuid) -> Result<GameSession, DomainError>;

    /// Closes a session and returns its final state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the session is not open.
    async fn remove(&self, session_id: Uuid) -> Result<GameSession, DomainError>;
}
