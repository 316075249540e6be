//! Time and location handlers.

use async_trait::async_trait;
use loremaster_core::error::DomainError;
use tracing::info;

use crate::application::handler::{CommandHandler, HandlerContext, unsupported};
use crate::domain::commands::{Command, CommandCategory, CommandKind};
use crate::domain::results::CommandResult;

/// Longest single jump of the in-world clock: one week.
const MAX_ADVANCE_MINUTES: u32 = 7 * 24 * 60;

/// Moves the in-world clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeHandler;

#[async_trait]
impl CommandHandler for TimeHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Time
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let CommandKind::AdvanceTime { minutes } = &command.kind else {
            return Err(unsupported(self.category(), command));
        };
        if *minutes == 0 || *minutes > MAX_ADVANCE_MINUTES {
            return Err(DomainError::Validation(format!(
                "time can advance by 1 to {MAX_ADVANCE_MINUTES} minutes, got {minutes}"
            )));
        }

        let mut session = ctx.session().write().await;
        session.game_time.advance(*minutes)?;
        session.bump_version();
        let time = session.game_time;
        let label = time.label();

        info!(correlation_id = %command.correlation_id, minutes, %label, "time advanced");
        Ok(CommandResult::TimeAdvanced { time, label })
    }
}

/// Moves the party.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationHandler;

#[async_trait]
impl CommandHandler for LocationHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Location
    }

    async fn handle(
        &self,
        command: &Command,
        ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let CommandKind::MoveParty { location } = &command.kind else {
            return Err(unsupported(self.category(), command));
        };
        let location = location.trim();
        if location.is_empty() {
            return Err(DomainError::Validation(
                "location must not be empty".to_owned(),
            ));
        }

        let mut session = ctx.session().write().await;
        let previous = session.location.replace(location.to_owned());
        session.bump_version();

        info!(correlation_id = %command.correlation_id, location, "party moved");
        Ok(CommandResult::LocationChanged {
            previous,
            location: location.to_owned(),
        })
    }
}
