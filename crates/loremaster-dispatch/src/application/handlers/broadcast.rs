//! Broadcast handler.

use std::sync::Arc;

use async_trait::async_trait;
use loremaster_core::error::DomainError;

use crate::application::broadcast::BroadcastHub;
use crate::application::handler::{CommandHandler, HandlerContext, unsupported};
use crate::domain::commands::{Command, CommandCategory, CommandKind};
use crate::domain::results::CommandResult;

/// Publishes events on the session stream. Never mutates the session.
#[derive(Debug)]
pub struct BroadcastHandler {
    hub: Arc<BroadcastHub>,
}

impl BroadcastHandler {
    /// Creates a handler publishing through `hub`.
    #[must_use]
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl CommandHandler for BroadcastHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Broadcast
    }

    async fn handle(
        &self,
        command: &Command,
        _ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let CommandKind::Broadcast { kind } = &command.kind else {
            return Err(unsupported(self.category(), command));
        };
        let (sequence, receivers) = self.hub.publish(command.session_id, kind.clone());
        Ok(CommandResult::Broadcasted {
            sequence,
            receivers,
        })
    }
}
