//! Engine wiring.

use std::sync::{Arc, Mutex};

use loremaster_core::clock::SystemClock;
use loremaster_core::rng::SeededRng;
use loremaster_orchestration::application::orchestrator::Orchestrator;
use loremaster_orchestration::application::services::{EngineParts, EngineServices, NarratorSet};
use loremaster_orchestration::config::EngineConfig;
use loremaster_store::memory_store::InMemorySessionStore;
use uuid::Uuid;

use crate::demo::{self, OfflineFactory, OfflineNarrator, RecapSummarizer};
use crate::error::AppError;

/// A running engine with one open session.
#[derive(Debug)]
pub struct AppState {
    /// The engine.
    pub orchestrator: Orchestrator,
    /// The session being played.
    pub session_id: Uuid,
}

impl AppState {
    /// Builds the engine with offline narrators and opens the demo
    /// session.
    ///
    /// # Errors
    ///
    /// Returns an error if handler registration fails or the session
    /// cannot be opened.
    pub async fn bootstrap(config: EngineConfig) -> Result<Self, AppError> {
        let narrator = Arc::new(OfflineNarrator::new(config.stream_capacity));
        let services = EngineServices::assemble(EngineParts {
            store: Arc::new(InMemorySessionStore::new()),
            narrators: NarratorSet {
                narrative: narrator.clone(),
                combat: narrator.clone(),
            },
            factory: Arc::new(OfflineFactory::new(config.stream_capacity)),
            summarizer: Arc::new(RecapSummarizer),
            clock: Arc::new(SystemClock),
            rng: Arc::new(Mutex::new(SeededRng::from_entropy())),
            config,
        })?;
        let orchestrator = Orchestrator::new(services);
        let session_id = orchestrator.open_session(demo::opening_session()).await?;
        Ok(Self {
            orchestrator,
            session_id,
        })
    }
}
