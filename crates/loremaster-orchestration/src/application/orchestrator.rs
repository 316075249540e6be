//! Entry point for turn processing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use loremaster_core::ids::EntityId;
use loremaster_core::session::GameSession;
use loremaster_dispatch::domain::commands::{Command, CommandKind};
use loremaster_dispatch::domain::events::BroadcastEvent;
use loremaster_narrator::domain::role::NarratorRole;
use tokio::sync::{Mutex as TurnMutex, OwnedMutexGuard, broadcast};
use tracing::{info, instrument};
use uuid::Uuid;

use super::services::EngineServices;
use super::step::{HaltReason, Pipeline};
use super::steps::{
    CombatLoopStep, DetectDialogueStep, DialogueSessionStep, EnrichContextStep, EnterCombatStep,
    ExecuteDialogueStep, ExecuteNarratorStep, LeaveCombatStep, ReloadSessionStep,
    SelectNarratorStep,
};
use crate::domain::context::{OrchestrationContext, TurnEvent};
use crate::error::OrchestrationError;

/// What one processed input produced.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// Everything emitted, in order.
    pub events: Vec<TurnEvent>,
    /// Why processing stopped early, if it did.
    pub halted: Option<HaltReason>,
    /// Narrator selected for the input; `None` when dialogue answered it.
    pub narrator: Option<NarratorRole>,
    /// Session state after the input.
    pub session: GameSession,
}

/// The standard step sequence.
#[must_use]
pub fn canonical_pipeline(services: &Arc<EngineServices>) -> Pipeline {
    Pipeline::new()
        .with_step(DetectDialogueStep)
        .with_step(DialogueSessionStep::new(Arc::clone(services)))
        .with_step(ExecuteDialogueStep::new(Arc::clone(services)))
        .with_step(SelectNarratorStep)
        .with_step(EnrichContextStep::new(Arc::clone(services)))
        .with_step(ExecuteNarratorStep::new(Arc::clone(services)))
        .with_step(ReloadSessionStep::new(Arc::clone(services)))
        .with_step(EnterCombatStep::new(Arc::clone(services)))
        .with_step(CombatLoopStep::new(Arc::clone(services)))
        .with_step(LeaveCombatStep::new(Arc::clone(services)))
}

/// Routes player input through the pipeline and owns session lifecycle.
///
/// At most one turn is in flight per session: `process_input` and
/// `remove_character` hold the session's turn lock for their whole run.
#[derive(Debug)]
pub struct Orchestrator {
    services: Arc<EngineServices>,
    pipeline: Pipeline,
    turns: Mutex<HashMap<Uuid, Arc<TurnMutex<()>>>>,
}

impl Orchestrator {
    /// Creates an orchestrator running the canonical pipeline.
    #[must_use]
    pub fn new(services: EngineServices) -> Self {
        let services = Arc::new(services);
        let pipeline = canonical_pipeline(&services);
        Self::with_pipeline(services, pipeline)
    }

    /// Creates an orchestrator running a custom pipeline.
    #[must_use]
    pub fn with_pipeline(services: Arc<EngineServices>, pipeline: Pipeline) -> Self {
        Self {
            services,
            pipeline,
            turns: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_turn(&self, session_id: Uuid) -> OwnedMutexGuard<()> {
        let turn = {
            let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(turns.entry(session_id).or_default())
        };
        turn.lock_owned().await
    }

    /// Shared services.
    #[must_use]
    pub fn services(&self) -> &Arc<EngineServices> {
        &self.services
    }

    /// Registers a session with the store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the session is already open.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn open_session(&self, session: GameSession) -> Result<Uuid, OrchestrationError> {
        let session_id = session.id;
        self.services.store.insert(session).await?;
        info!(%session_id, "session opened");
        Ok(session_id)
    }

    /// Subscribes to a session's broadcast events.
    #[must_use]
    pub fn subscribe(&self, session_id: Uuid) -> broadcast::Receiver<BroadcastEvent> {
        self.services.hub.subscribe(session_id)
    }

    /// Processes one player input.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown, a command cannot be
    /// routed, or the narrative or combat narrator fails.
    #[instrument(skip_all, fields(%session_id))]
    pub async fn process_input(
        &self,
        session_id: Uuid,
        input: &str,
    ) -> Result<TurnReport, OrchestrationError> {
        let _turn = self.lock_turn(session_id).await;
        let session = self.services.reload(session_id).await?;
        let run = self
            .pipeline
            .run(OrchestrationContext::new(input, session))
            .await?;
        info!(
            %session_id,
            steps = run.executed.len(),
            events = run.context.events.len(),
            halted = run.halted.is_some(),
            "input processed"
        );
        Ok(TurnReport {
            events: run.context.events,
            halted: run.halted,
            narrator: run.context.narrator,
            session: run.context.session,
        })
    }

    /// Takes a character out of the session and drops its narrator.
    ///
    /// # Errors
    ///
    /// Returns the handler's error if the character cannot be removed.
    #[instrument(skip_all, fields(%session_id, %entity_id))]
    pub async fn remove_character(
        &self,
        session_id: Uuid,
        entity_id: &EntityId,
    ) -> Result<(), OrchestrationError> {
        let _turn = self.lock_turn(session_id).await;
        self.services
            .dispatcher
            .execute(Command::new(
                session_id,
                CommandKind::RemoveCharacter {
                    entity_id: entity_id.clone(),
                },
            ))
            .await?;
        self.services.cache.evict_character(session_id, entity_id);
        Ok(())
    }

    /// Drains pending work, tears down the session's lanes, narrators, and
    /// event stream, and returns its final state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the session is not open.
    #[instrument(skip_all, fields(%session_id))]
    pub async fn end_session(&self, session_id: Uuid) -> Result<GameSession, OrchestrationError> {
        let _turn = self.lock_turn(session_id).await;
        self.services.dispatcher.wait_for_completion().await;
        let evicted = self.services.cache.evict_session(session_id);
        self.services.dispatcher.close_session(session_id);
        self.services.hub.close(session_id);
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session_id);
        let session = self.services.store.remove(session_id).await?;
        info!(%session_id, evicted, "session ended");
        Ok(session)
    }
}
