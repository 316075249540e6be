//! The combat turn scheduler service.

use loremaster_core::combat::{CombatSummary, Participant, TurnPosition};
use loremaster_core::error::DomainError;
use loremaster_core::ids::EntityId;
use loremaster_core::session::GameSession;
use loremaster_dispatch::application::dispatcher::Dispatcher;
use loremaster_dispatch::domain::commands::{Command, CommandKind};
use loremaster_dispatch::domain::results::CommandResult;
use loremaster_dispatch::error::DispatchError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::phase::{self, CombatPhase, TurnDecision, TurnMarker};
use crate::domain::prompts;

/// Answers turn-order queries and issues combat commands.
///
/// Queries read a session snapshot; commands go through the dispatcher so
/// the combat handler stays the only writer of combat state.
#[derive(Debug, Clone)]
pub struct CombatScheduler {
    dispatcher: Dispatcher,
}

fn unexpected(expected: &str, result: &CommandResult) -> DispatchError {
    DispatchError::Domain(DomainError::Infrastructure(format!(
        "expected {expected}, combat handler returned {result:?}"
    )))
}

impl CombatScheduler {
    /// Creates a scheduler issuing commands through `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// The phase of the session's encounter.
    #[must_use]
    pub fn phase(&self, session: &GameSession) -> CombatPhase {
        phase::phase(session)
    }

    /// What the current turn needs.
    #[must_use]
    pub fn next_decision(&self, session: &GameSession) -> TurnDecision {
        phase::next_decision(session)
    }

    /// Whether the combat narrator should be asked to end combat.
    #[must_use]
    pub fn should_end_combat(&self, session: &GameSession) -> bool {
        phase::should_end_combat(session)
    }

    /// Prompt for the combat narrator to resolve the current turn.
    #[must_use]
    pub fn turn_prompt(&self, session: &GameSession, last: Option<&TurnMarker>) -> String {
        prompts::turn_prompt(session, last)
    }

    /// Prompt for the combat narrator to close the encounter.
    #[must_use]
    pub fn end_prompt(&self, session: &GameSession) -> String {
        prompts::end_prompt(session)
    }

    /// Prompt asking an ally for a suggested action.
    #[must_use]
    pub fn ally_suggestion_prompt(&self, session: &GameSession, ally: &Participant) -> String {
        prompts::ally_suggestion_prompt(session, ally)
    }

    /// Starts an encounter.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error if the combat handler rejects the
    /// participants.
    #[instrument(skip(self, participants), fields(session_id = %session_id, count = participants.len()))]
    pub async fn start(
        &self,
        session_id: Uuid,
        participants: Vec<Participant>,
    ) -> Result<TurnPosition, DispatchError> {
        let result = self
            .dispatcher
            .execute(Command::new(
                session_id,
                CommandKind::StartCombat { participants },
            ))
            .await?;
        match result {
            CommandResult::CombatStarted { position, .. } => {
                info!(first = %position.entity_id, "encounter started");
                Ok(position)
            }
            other => Err(unexpected("CombatStarted", &other)),
        }
    }

    /// Passes the turn on.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error if combat is not active.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn advance(&self, session_id: Uuid) -> Result<TurnPosition, DispatchError> {
        match self
            .dispatcher
            .execute(Command::new(session_id, CommandKind::AdvanceTurn))
            .await?
        {
            CommandResult::TurnAdvanced(position) => Ok(position),
            other => Err(unexpected("TurnAdvanced", &other)),
        }
    }

    /// Takes a participant out of the rotation and returns how many enemies
    /// remain.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error if combat is not active, the entity is
    /// not fighting, or it is the last one standing.
    #[instrument(skip(self), fields(session_id = %session_id, entity_id = %entity_id))]
    pub async fn remove(&self, session_id: Uuid, entity_id: &EntityId) -> Result<usize, DispatchError> {
        match self
            .dispatcher
            .execute(Command::new(
                session_id,
                CommandKind::RemoveParticipant {
                    entity_id: entity_id.clone(),
                },
            ))
            .await?
        {
            CommandResult::ParticipantRemoved {
                remaining_enemies, ..
            } => Ok(remaining_enemies),
            other => Err(unexpected("ParticipantRemoved", &other)),
        }
    }

    /// Ends the encounter.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error if combat is not active.
    #[instrument(skip(self, reason), fields(session_id = %session_id))]
    pub async fn end(
        &self,
        session_id: Uuid,
        reason: Option<String>,
    ) -> Result<CombatSummary, DispatchError> {
        match self
            .dispatcher
            .execute(Command::new(session_id, CommandKind::EndCombat { reason }))
            .await?
        {
            CommandResult::CombatEnded(summary) => Ok(summary),
            other => Err(unexpected("CombatEnded", &other)),
        }
    }
}
