//! Dispatcher error types.

use loremaster_core::error::DomainError;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::commands::CommandCategory;

/// Errors raised by command routing and execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No handler is registered for the command's category.
    #[error("no handler registered for category `{0}`")]
    NoHandler(CommandCategory),

    /// A second handler tried to claim a category.
    #[error("a handler is already registered for category `{0}`")]
    DuplicateHandler(CommandCategory),

    /// A handler was registered under a category it does not serve.
    #[error("handler for `{handler}` cannot be registered under `{category}`")]
    CategoryMismatch {
        /// Category the registration claimed.
        category: CommandCategory,
        /// Category the handler declares.
        handler: CommandCategory,
    },

    /// Startup verification found categories with no handler.
    #[error("no handlers registered for categories: {0:?}")]
    MissingHandlers(Vec<CommandCategory>),

    /// The handler rejected or failed the command.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The lane worker went away before the command completed.
    #[error("command lane for session {0} closed before completion")]
    LaneClosed(Uuid),
}
