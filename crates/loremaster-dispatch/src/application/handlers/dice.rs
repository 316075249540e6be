//! Dice handler.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use loremaster_core::error::DomainError;
use loremaster_core::rng::DeterministicRng;
use tracing::info;

use crate::application::handler::{CommandHandler, HandlerContext, unsupported};
use crate::domain::commands::{Command, CommandCategory, CommandKind};
use crate::domain::dice::DiceExpression;
use crate::domain::results::CommandResult;

/// Rolls dice through the injected RNG. Never mutates the session.
pub struct DiceHandler {
    rng: Arc<Mutex<dyn DeterministicRng>>,
}

impl DiceHandler {
    /// Creates a handler rolling through `rng`.
    #[must_use]
    pub fn new(rng: Arc<Mutex<dyn DeterministicRng>>) -> Self {
        Self { rng }
    }
}

#[async_trait]
impl CommandHandler for DiceHandler {
    fn category(&self) -> CommandCategory {
        CommandCategory::Dice
    }

    async fn handle(
        &self,
        command: &Command,
        _ctx: &HandlerContext,
    ) -> Result<CommandResult, DomainError> {
        let CommandKind::RollDice {
            expression,
            purpose,
        } = &command.kind
        else {
            return Err(unsupported(self.category(), command));
        };

        let parsed: DiceExpression = expression.parse()?;
        let roll = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            parsed.roll(&mut *rng)
        };

        info!(
            correlation_id = %command.correlation_id,
            expression = %parsed,
            total = roll.total,
            "dice rolled"
        );

        Ok(CommandResult::DiceRolled {
            expression: parsed.to_string(),
            purpose: purpose.clone(),
            roll,
        })
    }
}

#[cfg(test)]
mod tests {
    use loremaster_test_support::SequenceRng;
    use uuid::Uuid;

    use super::*;
    use crate::application::handlers::test_util;

    fn handler(values: Vec<u32>) -> DiceHandler {
        DiceHandler::new(Arc::new(Mutex::new(SequenceRng::new(values))))
    }

    fn roll(expression: &str) -> Command {
        Command::new(
            Uuid::new_v4(),
            CommandKind::RollDice {
                expression: expression.into(),
                purpose: Some("attack".into()),
            },
        )
    }

    #[tokio::test]
    async fn test_roll_uses_injected_rng() {
        // Arrange
        let (ctx, shared) = test_util::context();
        let handler = handler(vec![4, 6]);

        // Act
        let result = handler.handle(&roll("2d6+1"), &ctx).await.unwrap();

        // Assert
        match result {
            CommandResult::DiceRolled {
                expression, roll, ..
            } => {
                assert_eq!(expression, "2d6+1");
                assert_eq!(roll.rolls, vec![4, 6]);
                assert_eq!(roll.total, 11);
            }
            other => panic!("expected DiceRolled, got {other:?}"),
        }
        assert_eq!(shared.read().await.version, 0);
    }

    #[tokio::test]
    async fn test_malformed_expression_is_rejected() {
        let (ctx, _shared) = test_util::context();

        let result = handler(vec![1]).handle(&roll("lots of dice"), &ctx).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
