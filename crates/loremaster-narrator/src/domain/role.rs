//! Narrator roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a narrator is being asked to do. The role decides the tool scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarratorRole {
    /// Exploration and story outside combat.
    Narrative,
    /// Turn-by-turn combat resolution.
    Combat,
    /// A non-player character answering the player directly.
    Dialogue,
    /// An allied combatant proposing its next action.
    AllySuggestion,
}

impl NarratorRole {
    /// Lower-case name used in logs and speaker labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Narrative => "narrative",
            Self::Combat => "combat",
            Self::Dialogue => "dialogue",
            Self::AllySuggestion => "ally_suggestion",
        }
    }
}

impl fmt::Display for NarratorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
