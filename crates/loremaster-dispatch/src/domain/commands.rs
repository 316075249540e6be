//! Commands accepted by the dispatcher.

use std::fmt;

use loremaster_core::combat::Participant;
use loremaster_core::conversation::MessageRole;
use loremaster_core::ids::EntityId;
use loremaster_core::session::QuestStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::BroadcastKind;

/// Routing key for commands. Each category is served by exactly one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandCategory {
    /// Hit points and other per-entity resources.
    Entity,
    /// Dice rolls.
    Dice,
    /// Items carried by characters.
    Inventory,
    /// In-world time.
    Time,
    /// Session event stream.
    Broadcast,
    /// Party location.
    Location,
    /// Turn order.
    Combat,
    /// Quest log.
    Quest,
    /// Party membership.
    Party,
    /// Conversation record.
    Conversation,
    /// Explicit dialogue pin.
    Dialogue,
}

impl CommandCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Entity,
        Self::Dice,
        Self::Inventory,
        Self::Time,
        Self::Broadcast,
        Self::Location,
        Self::Combat,
        Self::Quest,
        Self::Party,
        Self::Conversation,
        Self::Dialogue,
    ];

    /// Lower-case name used in logs and command type strings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Dice => "dice",
            Self::Inventory => "inventory",
            Self::Time => "time",
            Self::Broadcast => "broadcast",
            Self::Location => "location",
            Self::Combat => "combat",
            Self::Quest => "quest",
            Self::Party => "party",
            Self::Conversation => "conversation",
            Self::Dialogue => "dialogue",
        }
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category-specific payload of a command.
///
/// The serde tag doubles as the tool name for kinds a narrator may invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    /// Change an entity's hit points by `delta`.
    ApplyHpDelta {
        /// Target entity.
        entity_id: EntityId,
        /// Signed change; negative for damage.
        delta: i32,
        /// Why the change happened.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Take a non-player character out of the session.
    RemoveCharacter {
        /// Departing character.
        entity_id: EntityId,
    },
    /// Roll dice in `NdM+K` notation.
    RollDice {
        /// Dice expression.
        expression: String,
        /// What the roll is for.
        #[serde(default)]
        purpose: Option<String>,
    },
    /// Give items to a character.
    AddItem {
        /// Receiving character.
        entity_id: EntityId,
        /// Item name.
        item: String,
        /// How many.
        #[serde(default = "one")]
        quantity: u32,
    },
    /// Take items from a character.
    RemoveItem {
        /// Giving character.
        entity_id: EntityId,
        /// Item name.
        item: String,
        /// How many.
        #[serde(default = "one")]
        quantity: u32,
    },
    /// Move the in-world clock forward.
    AdvanceTime {
        /// Minutes to advance.
        minutes: u32,
    },
    /// Publish an event on the session stream.
    Broadcast {
        /// Event payload.
        kind: BroadcastKind,
    },
    /// Move the party somewhere else.
    MoveParty {
        /// Destination name.
        location: String,
    },
    /// Begin an encounter.
    StartCombat {
        /// Everyone taking part, in any order.
        participants: Vec<Participant>,
    },
    /// Pass the turn to the next participant.
    #[serde(rename = "next_turn")]
    AdvanceTurn,
    /// Take a participant out of the rotation.
    RemoveParticipant {
        /// Participant to remove.
        entity_id: EntityId,
    },
    /// Close the encounter.
    EndCombat {
        /// How the fight ended.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Add a quest to the log.
    StartQuest {
        /// Quest identifier.
        quest_id: String,
        /// Quest title.
        title: String,
    },
    /// Change a quest's status.
    UpdateQuest {
        /// Quest identifier.
        quest_id: String,
        /// New status.
        status: QuestStatus,
    },
    /// Add a character to the party.
    AddPartyMember {
        /// Joining character.
        entity_id: EntityId,
    },
    /// Remove a character from the party.
    RemovePartyMember {
        /// Leaving character.
        entity_id: EntityId,
    },
    /// Append a message to the conversation record.
    RecordMessage {
        /// Speaker display name.
        speaker: String,
        /// Speaker role.
        role: MessageRole,
        /// Message text.
        content: String,
    },
    /// Pin the exchange to explicitly addressed characters, or refresh the
    /// pin if one exists.
    BeginDialogue {
        /// Addressed characters.
        targets: Vec<EntityId>,
    },
    /// Release the dialogue pin.
    EndDialogue,
}

fn one() -> u32 {
    1
}

impl CommandKind {
    /// The routing category for this payload.
    #[must_use]
    pub fn category(&self) -> CommandCategory {
        match self {
            Self::ApplyHpDelta { .. } | Self::RemoveCharacter { .. } => CommandCategory::Entity,
            Self::RollDice { .. } => CommandCategory::Dice,
            Self::AddItem { .. } | Self::RemoveItem { .. } => CommandCategory::Inventory,
            Self::AdvanceTime { .. } => CommandCategory::Time,
            Self::Broadcast { .. } => CommandCategory::Broadcast,
            Self::MoveParty { .. } => CommandCategory::Location,
            Self::StartCombat { .. }
            | Self::AdvanceTurn
            | Self::RemoveParticipant { .. }
            | Self::EndCombat { .. } => CommandCategory::Combat,
            Self::StartQuest { .. } | Self::UpdateQuest { .. } => CommandCategory::Quest,
            Self::AddPartyMember { .. } | Self::RemovePartyMember { .. } => CommandCategory::Party,
            Self::RecordMessage { .. } => CommandCategory::Conversation,
            Self::BeginDialogue { .. } | Self::EndDialogue => CommandCategory::Dialogue,
        }
    }

    /// The type name for this command (for logging).
    #[must_use]
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::ApplyHpDelta { .. } => "entity.apply_hp_delta",
            Self::RemoveCharacter { .. } => "entity.remove_character",
            Self::RollDice { .. } => "dice.roll",
            Self::AddItem { .. } => "inventory.add_item",
            Self::RemoveItem { .. } => "inventory.remove_item",
            Self::AdvanceTime { .. } => "time.advance",
            Self::Broadcast { .. } => "broadcast.publish",
            Self::MoveParty { .. } => "location.move_party",
            Self::StartCombat { .. } => "combat.start",
            Self::AdvanceTurn => "combat.advance_turn",
            Self::RemoveParticipant { .. } => "combat.remove_participant",
            Self::EndCombat { .. } => "combat.end",
            Self::StartQuest { .. } => "quest.start",
            Self::UpdateQuest { .. } => "quest.update",
            Self::AddPartyMember { .. } => "party.add_member",
            Self::RemovePartyMember { .. } => "party.remove_member",
            Self::RecordMessage { .. } => "conversation.record",
            Self::BeginDialogue { .. } => "dialogue.begin",
            Self::EndDialogue => "dialogue.end",
        }
    }
}

/// A requested effect on one session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Correlation ID to trace this command through the system.
    pub correlation_id: Uuid,
    /// Session the effect applies to.
    pub session_id: Uuid,
    /// Category-specific payload.
    pub kind: CommandKind,
}

impl Command {
    /// Creates a command with a fresh correlation id.
    #[must_use]
    pub fn new(session_id: Uuid, kind: CommandKind) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            session_id,
            kind,
        }
    }

    /// Creates a command that shares the correlation id of its cause.
    #[must_use]
    pub fn caused_by(cause: &Self, kind: CommandKind) -> Self {
        Self {
            correlation_id: cause.correlation_id,
            session_id: cause.session_id,
            kind,
        }
    }

    /// The routing category.
    #[must_use]
    pub fn category(&self) -> CommandCategory {
        self.kind.category()
    }

    /// The type name for this command (for logging).
    #[must_use]
    pub fn command_type(&self) -> &'static str {
        self.kind.command_type()
    }
}

#[cfg(test)]
mod tests {
    use loremaster_core::combat::{EntityType, Faction};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_style_payload_deserializes_with_defaults() {
        // Arrange
        let payload = json!({
            "type": "start_combat",
            "participants": [
                { "entity_id": "hero", "entity_type": "player", "faction": "player", "initiative": 15 },
                { "entity_id": "goblin", "entity_type": "monster", "faction": "enemy", "initiative": 12 }
            ]
        });

        // Act
        let kind: CommandKind = serde_json::from_value(payload).unwrap();

        // Assert
        match kind {
            CommandKind::StartCombat { participants } => {
                assert_eq!(participants.len(), 2);
                assert!(participants.iter().all(|p| p.is_active));
                assert_eq!(participants[1].faction, Faction::Enemy);
                assert_eq!(participants[1].entity_type, EntityType::Monster);
            }
            other => panic!("expected StartCombat, got {other:?}"),
        }
    }

    #[test]
    fn test_next_turn_tag_maps_to_advance_turn() {
        let kind: CommandKind = serde_json::from_value(json!({ "type": "next_turn" })).unwrap();
        assert_eq!(kind, CommandKind::AdvanceTurn);
        assert_eq!(kind.category(), CommandCategory::Combat);
    }

    #[test]
    fn test_every_category_has_a_distinct_name() {
        let mut names: Vec<&str> = CommandCategory::ALL.iter().map(|c| c.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CommandCategory::ALL.len());
    }

    #[test]
    fn test_caused_by_keeps_correlation() {
        let session_id = Uuid::new_v4();
        let cause = Command::new(
            session_id,
            CommandKind::ApplyHpDelta {
                entity_id: EntityId::new("goblin"),
                delta: -5,
                reason: None,
            },
        );

        let effect = Command::caused_by(
            &cause,
            CommandKind::RemoveParticipant {
                entity_id: EntityId::new("goblin"),
            },
        );

        assert_eq!(effect.correlation_id, cause.correlation_id);
        assert_eq!(effect.session_id, session_id);
        assert_eq!(effect.command_type(), "combat.remove_participant");
    }
}
