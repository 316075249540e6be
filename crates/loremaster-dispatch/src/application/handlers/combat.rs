//! Turn-order handler.

use async_trait::async_trait;
use loremaster_core::combat::Faction;
use loremaster_core::error::DomainError;
use tracing::info;

use crate::application::handler::{CommandHandler, HandlerContext, unsupported};
use crate::domain::commands::{Command, CommandCategory, CommandKind};
use crate::domain::results::CommandResult;

/// Starts, advances, thins out and ends encounters.
///
/// Starting combat releases any dialogue pin.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombatHandler;

#[async_trait]
impl CommandHandler for CombatHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Combat
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let mut session = ctx.session().write().await;
        let result = match &command.kind {
            CommandKind::StartCombat { participants } => {
                for participant in participants {
                    session.character(&participant.entity_id)?;
                }
                let position = session.combat.start(participants.clone())?;
                session.dialogue = None;
                let order = session
                    .combat
                    .participants
                    .iter()
                    .map(|p| p.entity_id.clone())
                    .collect();
                info!(
                    correlation_id = %command.correlation_id,
                    participants = participants.len(),
                    first = %position.entity_id,
                    "combat started"
                );
                CommandResult::CombatStarted { order, position }
            }
            CommandKind::AdvanceTurn => {
                let position = session.combat.advance_turn()?;
                info!(
                    correlation_id = %command.correlation_id,
                    round = position.round_number,
                    entity_id = %position.entity_id,
                    "turn advanced"
                );
                CommandResult::TurnAdvanced(position)
            }
            CommandKind::RemoveParticipant { entity_id } => {
                let turn = session.combat.remove_participant(entity_id)?;
                let remaining_enemies = session.combat.active_in_faction(Faction::Enemy);
                info!(
                    correlation_id = %command.correlation_id,
                    %entity_id,
                    remaining_enemies,
                    "participant removed"
                );
                CommandResult::ParticipantRemoved {
                    entity_id: entity_id.clone(),
                    turn,
                    remaining_enemies,
                }
            }
            CommandKind::EndCombat { reason } => {
                let summary = session.combat.end()?;
                info!(
                    correlation_id = %command.correlation_id,
                    rounds = summary.rounds,
                    reason = reason.as_deref().unwrap_or_default(),
                    "combat ended"
                );
                CommandResult::CombatEnded(summary)
            }
            _ => return Err(unsupported(self.category(), command)),
        };
        session.bump_version();
        Ok(result)
    }
}
