//! Conversation record and dialogue pin handlers.

use std::sync::Arc;

use async_trait::async_trait;
use loremaster_core::clock::Clock;
use loremaster_core::dialogue::DialogueSession;
use loremaster_core::error::DomainError;
use tracing::{debug, info};

use crate::application::handler::{CommandHandler, HandlerContext, unsupported};
use crate::domain::commands::{Command, CommandCategory, CommandKind};
use crate::domain::results::CommandResult;

/// Appends messages to the conversation record.
pub struct ConversationHandler {
    clock: Arc<dyn Clock>,
}

impl ConversationHandler {
    /// Creates a handler stamping messages with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl CommandHandler for ConversationHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Conversation
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let CommandKind::RecordMessage {
            speaker,
            role,
            content,
        } = &command.kind
        else {
            return Err(unsupported(self.category(), command));
        };

        let mut session = ctx.session().write().await;
        let turn = session.record_message(speaker.as_str(), *role, content.as_str(), self.clock.now());
        session.bump_version();

        debug!(correlation_id = %command.correlation_id, turn, ?role, "message recorded");
        Ok(CommandResult::MessageRecorded { turn })
    }
}

/// Opens, refreshes and releases the explicit dialogue pin.
pub struct DialogueHandler {
    clock: Arc<dyn Clock>,
}

impl DialogueHandler {
    /// Creates a handler stamping interactions with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl CommandHandler for DialogueHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Dialogue
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let mut session = ctx.session().write().await;
        let targets = match &command.kind {
            CommandKind::BeginDialogue { targets } => {
                if targets.is_empty() {
                    return Err(DomainError::Validation(
                        "dialogue requires at least one target".to_owned(),
                    ));
                }
                if session.combat.is_active {
                    return Err(DomainError::Validation(
                        "dialogue cannot begin during combat".to_owned(),
                    ));
                }
                for target in targets {
                    session.character(target)?;
                    if *target == session.player_id {
                        return Err(DomainError::Validation(
                            "the player cannot be a dialogue target".to_owned(),
                        ));
                    }
                }
                let now = self.clock.now();
                match session.dialogue.as_mut() {
                    Some(dialogue) => dialogue.refresh(targets.clone(), now),
                    None => session.dialogue = Some(DialogueSession::begin(targets.clone(), now)),
                }
                info!(
                    correlation_id = %command.correlation_id,
                    targets = targets.len(),
                    "dialogue pinned"
                );
                targets.clone()
            }
            CommandKind::EndDialogue => {
                if session.dialogue.take().is_some() {
                    info!(correlation_id = %command.correlation_id, "dialogue released");
                }
                Vec::new()
            }
            _ => return Err(unsupported(self.category(), command)),
        };
        session.bump_version();
        Ok(CommandResult::DialogueChanged { targets })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use loremaster_core::conversation::MessageRole;
    use loremaster_core::ids::EntityId;
    use loremaster_test_support::FixedClock;
    use uuid::Uuid;

    use super::*;
    use crate::application::handlers::test_util;

    fn begin(targets: &[&str]) -> Command {
        Command::new(
            Uuid::new_v4(),
            CommandKind::BeginDialogue {
                targets: targets.iter().copied().map(EntityId::new).collect(),
            },
        )
    }

    #[tokio::test]
    async fn test_player_message_opens_a_turn() {
        // Arrange
        let (ctx, shared) = test_util::context();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let handler = ConversationHandler::new(Arc::new(FixedClock(at)));
        let command = Command::new(
            Uuid::new_v4(),
            CommandKind::RecordMessage {
                speaker: "Aria".into(),
                role: MessageRole::Player,
                content: "I draw my sword.".into(),
            },
        );

        // Act
        let result = handler.handle(&command, &ctx).await.unwrap();

        // Assert
        assert_eq!(result, CommandResult::MessageRecorded { turn: 1 });
        let session = shared.read().await;
        assert_eq!(session.conversation.len(), 1);
        assert_eq!(session.conversation[0].recorded_at, at);
    }

    #[tokio::test]
    async fn test_refresh_keeps_start_and_bumps_interaction() {
        // Arrange
        let (ctx, shared) = test_util::context();
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        DialogueHandler::new(Arc::new(FixedClock(start)))
            .handle(&begin(&["mira"]), &ctx)
            .await
            .unwrap();
        let later = start + Duration::minutes(5);

        // Act
        let result = DialogueHandler::new(Arc::new(FixedClock(later)))
            .handle(&begin(&["eldrin", "mira"]), &ctx)
            .await
            .unwrap();

        // Assert
        assert_eq!(
            result,
            CommandResult::DialogueChanged {
                targets: vec![EntityId::new("eldrin"), EntityId::new("mira")]
            }
        );
        let session = shared.read().await;
        let dialogue = session.dialogue.as_ref().unwrap();
        assert_eq!(dialogue.started_at, start);
        assert_eq!(dialogue.last_interaction_at, later);
    }

    #[tokio::test]
    async fn test_player_is_not_a_valid_target() {
        let (ctx, shared) = test_util::context();
        let handler = DialogueHandler::new(Arc::new(FixedClock(Utc::now())));

        let result = handler.handle(&begin(&["hero"]), &ctx).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(shared.read().await.dialogue.is_none());
    }

    #[tokio::test]
    async fn test_end_dialogue_is_idempotent() {
        let (ctx, shared) = test_util::context();
        let handler = DialogueHandler::new(Arc::new(FixedClock(Utc::now())));
        handler.handle(&begin(&["mira"]), &ctx).await.unwrap();
        let end = Command::new(Uuid::new_v4(), CommandKind::EndDialogue);

        let first = handler.handle(&end, &ctx).await.unwrap();
        let second = handler.handle(&end, &ctx).await.unwrap();

        assert_eq!(first, CommandResult::DialogueChanged { targets: vec![] });
        assert_eq!(second, first);
        assert!(shared.read().await.dialogue.is_none());
    }
}
