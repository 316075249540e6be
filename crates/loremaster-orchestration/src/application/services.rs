//! Explicitly constructed collaborators shared by every step.

use std::fmt;
use std::sync::{Arc, Mutex};

use loremaster_combat::application::scheduler::CombatScheduler;
use loremaster_core::clock::Clock;
use loremaster_core::conversation::MessageRole;
use loremaster_core::repository::SessionStore;
use loremaster_core::rng::DeterministicRng;
use loremaster_core::session::GameSession;
use loremaster_dispatch::application::broadcast::BroadcastHub;
use loremaster_dispatch::application::dispatcher::Dispatcher;
use loremaster_dispatch::application::handlers::{HandlerDeps, register_standard_handlers};
use loremaster_dispatch::domain::commands::{Command, CommandKind};
use loremaster_dispatch::domain::events::BroadcastKind;
use loremaster_dispatch::error::DispatchError;
use loremaster_narrator::application::cache::{NarratorCache, NarratorFactory};
use loremaster_narrator::application::narrator::{Narrator, Summarizer};
use tracing::warn;
use uuid::Uuid;

use super::context_builder::{ContextBuilder, DefaultContextBuilder};
use crate::config::EngineConfig;
use crate::error::OrchestrationError;

/// The session-wide narrators.
#[derive(Clone)]
pub struct NarratorSet {
    /// Exploration and story.
    pub narrative: Arc<dyn Narrator>,
    /// Combat resolution.
    pub combat: Arc<dyn Narrator>,
}

/// Everything needed to assemble an engine.
pub struct EngineParts {
    /// Live session store.
    pub store: Arc<dyn SessionStore>,
    /// Narrative and combat narrators.
    pub narrators: NarratorSet,
    /// Creates per-character narrators.
    pub factory: Arc<dyn NarratorFactory>,
    /// Transition summarizer.
    pub summarizer: Arc<dyn Summarizer>,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
    /// Dice source.
    pub rng: Arc<Mutex<dyn DeterministicRng>>,
    /// Engine knobs.
    pub config: EngineConfig,
}

/// Collaborators shared by the pipeline steps.
pub struct EngineServices {
    /// Live session store.
    pub store: Arc<dyn SessionStore>,
    /// Command dispatcher with the standard handler set.
    pub dispatcher: Dispatcher,
    /// Session event stream.
    pub hub: Arc<BroadcastHub>,
    /// Combat turn scheduler.
    pub scheduler: CombatScheduler,
    /// Narrative and combat narrators.
    pub narrators: NarratorSet,
    /// Per-character narrators.
    pub cache: NarratorCache,
    /// Transition summarizer.
    pub summarizer: Arc<dyn Summarizer>,
    /// Renders sessions into narrator context.
    pub context_builder: Arc<dyn ContextBuilder>,
    /// Engine knobs.
    pub config: EngineConfig,
}

impl fmt::Debug for EngineServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineServices")
            .field("dispatcher", &self.dispatcher)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EngineServices {
    /// Builds the dispatcher, registers the standard handlers, and wires
    /// the remaining services around it.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError` if handler registration or verification
    /// fails; the engine must not start in that case.
    pub fn assemble(parts: EngineParts) -> Result<Self, DispatchError> {
        let hub = Arc::new(BroadcastHub::new(parts.config.broadcast_capacity));
        let mut builder = Dispatcher::builder(Arc::clone(&parts.store));
        register_standard_handlers(
            &mut builder,
            &HandlerDeps {
                clock: parts.clock,
                rng: parts.rng,
                hub: Arc::clone(&hub),
            },
        )?;
        let dispatcher = builder.build()?;

        Ok(Self {
            store: parts.store,
            scheduler: CombatScheduler::new(dispatcher.clone()),
            dispatcher,
            hub,
            narrators: parts.narrators,
            cache: NarratorCache::new(parts.factory),
            summarizer: parts.summarizer,
            context_builder: Arc::new(DefaultContextBuilder::default()),
            config: parts.config,
        })
    }

    /// Fresh snapshot of a session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if the session is not open.
    pub async fn reload(&self, session_id: Uuid) -> Result<GameSession, OrchestrationError> {
        Ok(self.store.snapshot(session_id).await?)
    }

    /// Publishes an event without waiting for it.
    pub(crate) fn broadcast(&self, session_id: Uuid, kind: BroadcastKind) {
        let command = Command::new(session_id, CommandKind::Broadcast { kind });
        if let Err(err) = self.dispatcher.submit(vec![command]) {
            warn!(%session_id, error = %err, "broadcast not submitted");
        }
    }

    /// Appends a message to the conversation record and waits for it.
    pub(crate) async fn record(
        &self,
        session_id: Uuid,
        speaker: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), OrchestrationError> {
        let command = Command::new(
            session_id,
            CommandKind::RecordMessage {
                speaker: speaker.to_owned(),
                role,
                content: content.to_owned(),
            },
        );
        self.dispatcher
            .submit_and_wait(vec![command])
            .await?
            .into_results()?;
        Ok(())
    }
}
