//! Results returned by command handlers.

use loremaster_core::clock::GameTime;
use loremaster_core::combat::{CombatSummary, TurnPosition};
use loremaster_core::ids::EntityId;
use loremaster_core::session::{HpChange, QuestStatus};
use serde::{Deserialize, Serialize};

use super::dice::DiceRoll;

/// The typed result of exactly one handled command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandResult {
    /// Hit points changed.
    HpChanged(HpChange),
    /// A character left the session.
    CharacterRemoved {
        /// Departed character.
        entity_id: EntityId,
    },
    /// Dice were rolled.
    DiceRolled {
        /// Normalized expression.
        expression: String,
        /// What the roll was for.
        purpose: Option<String>,
        /// Individual results and total.
        roll: DiceRoll,
    },
    /// An inventory stack changed.
    InventoryChanged {
        /// Owner of the stack.
        entity_id: EntityId,
        /// Item name.
        item: String,
        /// Stack size after the change.
        quantity: u32,
    },
    /// The in-world clock moved.
    TimeAdvanced {
        /// New time.
        time: GameTime,
        /// Human-readable label.
        label: String,
    },
    /// An event went out on the session stream.
    Broadcasted {
        /// Emission sequence number.
        sequence: u64,
        /// Subscribers that received it.
        receivers: usize,
    },
    /// The party moved.
    LocationChanged {
        /// Where the party was.
        previous: Option<String>,
        /// Where the party is now.
        location: String,
    },
    /// An encounter began.
    CombatStarted {
        /// Initiative order.
        order: Vec<EntityId>,
        /// Opening turn.
        position: TurnPosition,
    },
    /// The turn passed on.
    TurnAdvanced(TurnPosition),
    /// A participant left the rotation.
    ParticipantRemoved {
        /// Removed participant.
        entity_id: EntityId,
        /// New turn position if the removed participant held the turn.
        turn: Option<TurnPosition>,
        /// Active enemies left.
        remaining_enemies: usize,
    },
    /// The encounter closed.
    CombatEnded(CombatSummary),
    /// A quest changed.
    QuestUpdated {
        /// Quest identifier.
        quest_id: String,
        /// New status.
        status: QuestStatus,
    },
    /// Party membership changed.
    PartyChanged {
        /// Members after the change.
        members: Vec<EntityId>,
    },
    /// A conversation message was appended.
    MessageRecorded {
        /// Conversation turn of the message.
        turn: u32,
    },
    /// The dialogue pin changed; empty when released.
    DialogueChanged {
        /// Pinned characters.
        targets: Vec<EntityId>,
    },
}
