//! Dialogue session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// How the dialogue session decides who is being addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueMode {
    /// Only characters the player explicitly names take part.
    ExplicitOnly,
}

/// An exchange pinned to one or more explicitly addressed characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueSession {
    /// Addressing mode.
    pub mode: DialogueMode,
    /// Characters the exchange is pinned to.
    pub target_ids: Vec<EntityId>,
    /// When the exchange began.
    pub started_at: DateTime<Utc>,
    /// When the player last addressed the targets.
    pub last_interaction_at: DateTime<Utc>,
}

impl DialogueSession {
    /// Opens an explicit-only exchange with the given targets.
    #[must_use]
    pub fn begin(target_ids: Vec<EntityId>, now: DateTime<Utc>) -> Self {
        Self {
            mode: DialogueMode::ExplicitOnly,
            target_ids,
            started_at: now,
            last_interaction_at: now,
        }
    }

    /// Re-targets the exchange and bumps the interaction timestamp, keeping
    /// the original start time.
    pub fn refresh(&mut self, target_ids: Vec<EntityId>, now: DateTime<Utc>) {
        self.target_ids = target_ids;
        self.last_interaction_at = now;
    }
}
