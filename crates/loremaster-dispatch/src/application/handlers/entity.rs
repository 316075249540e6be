//! Entity resource handler.

use async_trait::async_trait;
use loremaster_core::combat::Faction;
use loremaster_core::error::DomainError;
use loremaster_core::ids::EntityId;
use tracing::info;

use crate::application::handler::{CommandHandler, HandlerContext, unsupported};
use crate::domain::commands::{Command, CommandCategory, CommandKind};
use crate::domain::results::CommandResult;

/// Applies hit-point changes and removes departing characters.
///
/// A non-player combatant reduced to zero during an active encounter is taken
/// out of the rotation with a triggered `RemoveParticipant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityHandler;

#[async_trait]
impl CommandHandler for EntityHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Entity
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        match &command.kind {
            CommandKind::ApplyHpDelta {
                entity_id,
                delta,
                reason,
            } => apply_hp_delta(command, ctx, entity_id, *delta, reason.as_deref()).await,
            CommandKind::RemoveCharacter { entity_id } => {
                let mut session = ctx.session().write().await;
                let removed = session.remove_character(entity_id)?;
                session.bump_version();
                info!(
                    correlation_id = %command.correlation_id,
                    %entity_id,
                    name = %removed.name,
                    "character removed"
                );
                Ok(CommandResult::CharacterRemoved {
                    entity_id: entity_id.clone(),
                })
            }
            _ => Err(unsupported(self.category(), command)),
        }
    }
}

async fn apply_hp_delta(
    command: &Command,
    ctx: &HandlerContext,
    entity_id: &EntityId,
    delta: i32,
    reason: Option<&str>,
) -> Result<CommandResult, DomainError> {
    let mut session = ctx.session().write().await;
    let change = session.apply_hp_delta(entity_id, delta)?;
    session.bump_version();

    info!(
        correlation_id = %command.correlation_id,
        %entity_id,
        delta,
        hp = change.hp,
        reason = reason.unwrap_or_default(),
        "hit points changed"
    );

    let knocked_out = change.reduced_to_zero()
        && session.combat.is_active
        && session
            .combat
            .participant(entity_id)
            .is_some_and(|p| p.is_active && p.faction != Faction::Player);
    if knocked_out {
        ctx.trigger(Command::caused_by(
            command,
            CommandKind::RemoveParticipant {
                entity_id: entity_id.clone(),
            },
        ));
    }

    Ok(CommandResult::HpChanged(change))
}
