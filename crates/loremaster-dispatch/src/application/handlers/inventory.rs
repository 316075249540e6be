//! Inventory handler.

use async_trait::async_trait;
use loremaster_core::error::DomainError;
use tracing::info;

use crate::application::handler::{CommandHandler, HandlerContext, unsupported};
use crate::domain::commands::{Command, CommandCategory, CommandKind};
use crate::domain::results::CommandResult;

/// Adds and removes carried items.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryHandler;

#[async_trait]
impl CommandHandler for InventoryHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Inventory
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let mut session = ctx.session().write().await;
        let (entity_id, item, quantity) = match &command.kind {
            CommandKind::AddItem {
                entity_id,
                item,
                quantity,
            } => (entity_id, item, session.add_item(entity_id, item, *quantity)?),
            CommandKind::RemoveItem {
                entity_id,
                item,
                quantity,
            } => (
                entity_id,
                item,
                session.remove_item(entity_id, item, *quantity)?,
            ),
            _ => return Err(unsupported(self.category(), command)),
        };
        session.bump_version();

        info!(
            correlation_id = %command.correlation_id,
            %entity_id,
            item = %item,
            quantity,
            "inventory changed"
        );

        Ok(CommandResult::InventoryChanged {
            entity_id: entity_id.clone(),
            item: item.clone(),
            quantity,
        })
    }
}
