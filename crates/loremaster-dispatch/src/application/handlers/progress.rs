//! Quest log and party handlers.

use async_trait::async_trait;
use loremaster_core::error::DomainError;
use loremaster_core::session::{Quest, QuestStatus};
use tracing::info;

use crate::application::handler::{CommandHandler, HandlerContext, unsupported};
use crate::domain::commands::{Command, CommandCategory, CommandKind};
use crate::domain::results::CommandResult;

/// Starts quests and moves them between statuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestHandler;

#[async_trait]
impl CommandHandler for QuestHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Quest
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let mut session = ctx.session().write().await;
        let (quest_id, status) = match &command.kind {
            CommandKind::StartQuest { quest_id, title } => {
                if session.quests.contains_key(quest_id) {
                    return Err(DomainError::Validation(format!(
                        "quest {quest_id} already exists"
                    )));
                }
                session.quests.insert(
                    quest_id.clone(),
                    Quest {
                        title: title.clone(),
                        status: QuestStatus::Active,
                    },
                );
                (quest_id, QuestStatus::Active)
            }
            CommandKind::UpdateQuest { quest_id, status } => {
                let quest = session
                    .quests
                    .get_mut(quest_id)
                    .ok_or_else(|| DomainError::Validation(format!("unknown quest {quest_id}")))?;
                quest.status = *status;
                (quest_id, *status)
            }
            _ => return Err(unsupported(self.category(), command)),
        };
        session.bump_version();

        info!(correlation_id = %command.correlation_id, quest_id = %quest_id, ?status, "quest updated");
        Ok(CommandResult::QuestUpdated {
            quest_id: quest_id.clone(),
            status,
        })
    }
}

/// Adds and removes party members. The player is never a party member.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartyHandler;

#[async_trait]
impl CommandHandler for PartyHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Party
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let mut session = ctx.session().write().await;
        match &command.kind {
            CommandKind::AddPartyMember { entity_id } => {
                session.character(entity_id)?;
                if *entity_id == session.player_id {
                    return Err(DomainError::Validation(
                        "the player leads the party and cannot join it".to_owned(),
                    ));
                }
                if session.party.contains(entity_id) {
                    return Err(DomainError::Validation(format!(
                        "{entity_id} is already in the party"
                    )));
                }
                session.party.push(entity_id.clone());
                info!(correlation_id = %command.correlation_id, %entity_id, "party member joined");
            }
            CommandKind::RemovePartyMember { entity_id } => {
                let index = session
                    .party
                    .iter()
                    .position(|member| member == entity_id)
                    .ok_or_else(|| {
                        DomainError::Validation(format!("{entity_id} is not in the party"))
                    })?;
                session.party.remove(index);
                info!(correlation_id = %command.correlation_id, %entity_id, "party member left");
            }
            _ => return Err(unsupported(self.category(), command)),
        }
        session.bump_version();

        Ok(CommandResult::PartyChanged {
            members: session.party.clone(),
        })
    }
}
