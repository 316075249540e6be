//! Handler contract.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use loremaster_core::error::DomainError;
use loremaster_core::repository::SharedSession;

use crate::domain::commands::{Command, CommandCategory};
use crate::domain::results::CommandResult;

/// Executes the commands of one category.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// The category this handler serves.
    fn category(&self) -> CommandCategory;

    /// Whether this handler can execute the command.
    fn can_handle(&self, command: &Command) -> bool {
        command.category() == self.category()
    }

    /// Executes the command against the live session.
    ///
    /// # Errors
    ///
    /// Returns a `DomainError` when the command references an unknown entity
    /// or violates a domain rule.
    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError>;
}

/// What a handler gets to work with while executing one command.
#[derive(Debug)]
pub struct HandlerContext {
    session: SharedSession,
    triggered: Mutex<Vec<Command>>,
}

impl HandlerContext {
    /// Creates a context around the live session.
    #[must_use]
    pub fn new(session: SharedSession) -> Self {
        Self {
            session,
            triggered: Mutex::new(Vec::new()),
        }
    }

    /// The live session the command targets.
    #[must_use]
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Queues a follow-up command. It joins the batch of the command being
    /// handled, so `submit_and_wait` also waits for it.
    pub fn trigger(&self, command: Command) {
        self.triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    /// Drains the queued follow-ups.
    pub fn take_triggered(&self) -> Vec<Command> {
        std::mem::take(&mut *self.triggered.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Error for a command routed to a handler that does not understand it.
pub(crate) fn unsupported(handler: CommandCategory, command: &Command) -> DomainError {
    DomainError::Validation(format!(
        "{handler} handler cannot execute {}",
        command.command_type()
    ))
}
