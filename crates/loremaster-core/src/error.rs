//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::ids::EntityId;

/// Top-level domain error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// No live session exists for the identifier.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// A command referenced a character, NPC, or monster the session does
    /// not know about.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
