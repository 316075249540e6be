//! The canonical pipeline steps.

mod combat;
mod dialogue;
mod narrator;

pub use combat::{CombatLoopStep, EnterCombatStep, LeaveCombatStep};
pub use dialogue::{DetectDialogueStep, DialogueSessionStep, ExecuteDialogueStep};
pub use narrator::{EnrichContextStep, ExecuteNarratorStep, ReloadSessionStep, SelectNarratorStep};
