//! The per-input orchestration context.
//!
//! A context is created for one player input, threaded through every step,
//! and discarded when the pipeline finishes. Steps never mutate a context
//! they were handed; they return a new one built with the `with_*` methods.

use loremaster_core::ids::EntityId;
use loremaster_core::session::GameSession;
use loremaster_narrator::domain::role::NarratorRole;
use loremaster_narrator::domain::stream::StreamEvent;
use loremaster_narrator::domain::tools::Tool;
use serde::Serialize;
use uuid::Uuid;

/// Something that happened while processing an input, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Output of a narrator invocation.
    Narrator {
        /// Role of the invocation.
        role: NarratorRole,
        /// Who spoke.
        speaker: String,
        /// The streamed event.
        event: StreamEvent,
    },
    /// A narrator handoff bridge.
    Transition {
        /// Outgoing narrator.
        from: NarratorRole,
        /// Incoming narrator.
        to: NarratorRole,
        /// The bridging summary.
        summary: String,
    },
    /// An ally's proposed action, awaiting the player's decision.
    Suggestion {
        /// The ally.
        entity_id: EntityId,
        /// What it proposes.
        text: String,
    },
    /// The auto-continuation loop stopped at its ceiling.
    LoopCapReached {
        /// Iterations run.
        iterations: usize,
    },
}

impl TurnEvent {
    /// Whether this is a narrator `error` event.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Narrator {
                event: StreamEvent::Error(_),
                ..
            }
        )
    }
}

/// State threaded through the pipeline for one input.
#[derive(Debug, Clone)]
pub struct OrchestrationContext {
    /// The raw player input.
    pub input: String,
    /// Session the input belongs to.
    pub session_id: Uuid,
    /// Latest session snapshot; refreshed by reload steps.
    pub session: GameSession,
    /// Narrator chosen for this input.
    pub narrator: Option<NarratorRole>,
    /// Text handed to the narrator alongside the input.
    pub working_context: String,
    /// Tools the input hints at, within the narrator's scope.
    pub suggested_tools: Vec<Tool>,
    /// Whether combat was active when the input arrived.
    pub combat_was_active: bool,
    /// Whether combat started while processing this input.
    pub combat_entered: bool,
    /// Characters the input explicitly addresses.
    pub dialogue_targets: Vec<EntityId>,
    /// Everything emitted so far.
    pub events: Vec<TurnEvent>,
}

impl OrchestrationContext {
    /// Creates the context for a fresh input.
    #[must_use]
    pub fn new(input: impl Into<String>, session: GameSession) -> Self {
        Self {
            input: input.into(),
            session_id: session.id,
            combat_was_active: session.combat.is_active,
            session,
            narrator: None,
            working_context: String::new(),
            suggested_tools: Vec::new(),
            combat_entered: false,
            dialogue_targets: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Replaces the session snapshot and notes whether combat started.
    #[must_use]
    pub fn with_session(mut self, session: GameSession) -> Self {
        if session.combat.is_active && !self.combat_was_active {
            self.combat_entered = true;
        }
        self.session = session;
        self
    }

    /// Sets the selected narrator.
    #[must_use]
    pub fn with_narrator(mut self, role: NarratorRole) -> Self {
        self.narrator = Some(role);
        self
    }

    /// Replaces the working context.
    #[must_use]
    pub fn with_working_context(mut self, text: impl Into<String>) -> Self {
        self.working_context = text.into();
        self
    }

    /// Sets the suggested tools.
    #[must_use]
    pub fn with_suggested_tools(mut self, tools: Vec<Tool>) -> Self {
        self.suggested_tools = tools;
        self
    }

    /// Sets the explicitly addressed characters.
    #[must_use]
    pub fn with_dialogue_targets(mut self, targets: Vec<EntityId>) -> Self {
        self.dialogue_targets = targets;
        self
    }

    /// Appends events.
    #[must_use]
    pub fn with_events(mut self, events: impl IntoIterator<Item = TurnEvent>) -> Self {
        self.events.extend(events);
        self
    }

    /// Appends one event.
    #[must_use]
    pub fn with_event(self, event: TurnEvent) -> Self {
        self.with_events([event])
    }

    /// Whether combat was active at some point during this input and is
    /// not any more.
    #[must_use]
    pub fn combat_ended(&self) -> bool {
        (self.combat_was_active || self.combat_entered) && !self.session.combat.is_active
    }
}
