//! The session aggregate.
//!
//! A `GameSession` holds everything a turn can read: the characters in play,
//! combat state, the dialogue pin, and the conversation record. Only command
//! handlers mutate it; orchestration code works on snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::GameTime;
use crate::combat::{CombatState, EntityType};
use crate::conversation::{ConversationMessage, MessageRole};
use crate::dialogue::DialogueSession;
use crate::error::DomainError;
use crate::ids::EntityId;

/// How much narrative weight a non-player character carries.
///
/// Major characters get a dedicated narrator that remembers its own
/// reasoning; minor ones share a single performer per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// A recurring character with a dedicated narrator.
    Major,
    /// A walk-on character voiced by the shared narrator.
    Minor,
}

/// A stack of items carried by a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item name as it appears in the catalog.
    pub name: String,
    /// Stack size, always positive.
    pub quantity: u32,
}

/// A character, NPC, or monster present in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Stable identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Player, NPC, or monster.
    pub entity_type: EntityType,
    /// Current hit points.
    pub hp: i32,
    /// Maximum hit points.
    pub max_hp: i32,
    /// Narrative weight; only meaningful for NPCs.
    pub importance: Importance,
    /// Persona block handed to the narrator voicing this character.
    pub persona: String,
    /// Carried items.
    pub inventory: Vec<InventoryItem>,
}

impl Character {
    /// Creates a character at full health with an empty inventory.
    #[must_use]
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        entity_type: EntityType,
        max_hp: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type,
            hp: max_hp,
            max_hp,
            importance: Importance::Minor,
            persona: String::new(),
            inventory: Vec::new(),
        }
    }

    /// Sets the narrative weight.
    #[must_use]
    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    /// Sets the persona block.
    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }
}

/// Result of applying a hit-point delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HpChange {
    /// Affected entity.
    pub entity_id: EntityId,
    /// Hit points before the change.
    pub previous_hp: i32,
    /// Hit points after clamping.
    pub hp: i32,
    /// Maximum hit points.
    pub max_hp: i32,
}

impl HpChange {
    /// Whether this change took the entity from standing to zero.
    #[must_use]
    pub fn reduced_to_zero(&self) -> bool {
        self.previous_hp > 0 && self.hp == 0
    }
}

/// Progress of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Accepted and in progress.
    Active,
    /// Finished successfully.
    Completed,
    /// Abandoned or lost.
    Failed,
}

/// A quest the party has picked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// Quest title.
    pub title: String,
    /// Current status.
    pub status: QuestStatus,
}

/// The aggregate root for a play session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Number of mutations applied by command handlers.
    pub version: i64,
    /// The human-controlled character.
    pub player_id: EntityId,
    /// Everyone present, keyed by id.
    pub characters: BTreeMap<EntityId, Character>,
    /// Characters travelling with the player.
    pub party: Vec<EntityId>,
    /// Current location name.
    pub location: Option<String>,
    /// In-world time.
    pub game_time: GameTime,
    /// Known quests, keyed by quest id.
    pub quests: BTreeMap<String, Quest>,
    /// Turn order state.
    pub combat: CombatState,
    /// Explicit dialogue pin, if any.
    pub dialogue: Option<DialogueSession>,
    /// Everything said so far.
    pub conversation: Vec<ConversationMessage>,
    /// Conversation turn counter, bumped on each player message.
    pub turn: u32,
}

impl GameSession {
    /// Creates a session around the player character.
    #[must_use]
    pub fn new(id: Uuid, player: Character) -> Self {
        let player_id = player.id.clone();
        let mut characters = BTreeMap::new();
        characters.insert(player_id.clone(), player);
        Self {
            id,
            version: 0,
            player_id,
            characters,
            party: Vec::new(),
            location: None,
            game_time: GameTime::default(),
            quests: BTreeMap::new(),
            combat: CombatState::default(),
            dialogue: None,
            conversation: Vec::new(),
            turn: 0,
        }
    }

    /// Adds or replaces a character.
    pub fn add_character(&mut self, character: Character) {
        self.characters.insert(character.id.clone(), character);
    }

    /// Looks up a character.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EntityNotFound` if the id is unknown.
    pub fn character(&self, id: &EntityId) -> Result<&Character, DomainError> {
        self.characters
            .get(id)
            .ok_or_else(|| DomainError::EntityNotFound(id.clone()))
    }

    /// Looks up a character for mutation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EntityNotFound` if the id is unknown.
    pub fn character_mut(&mut self, id: &EntityId) -> Result<&mut Character, DomainError> {
        self.characters
            .get_mut(id)
            .ok_or_else(|| DomainError::EntityNotFound(id.clone()))
    }

    /// Finds a character by display name, ignoring case.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Character> {
        self.characters
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Records that a handler mutated the aggregate.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Applies a hit-point delta, clamped to `[0, max_hp]`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EntityNotFound` if the id is unknown.
    pub fn apply_hp_delta(&mut self, id: &EntityId, delta: i32) -> Result<HpChange, DomainError> {
        let character = self.character_mut(id)?;
        let previous_hp = character.hp;
        character.hp = previous_hp.saturating_add(delta).clamp(0, character.max_hp);
        Ok(HpChange {
            entity_id: id.clone(),
            previous_hp,
            hp: character.hp,
            max_hp: character.max_hp,
        })
    }

    /// Adds items to a character's inventory and returns the new stack size.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a zero quantity or a stack that
    /// would overflow, and `DomainError::EntityNotFound` for an unknown
    /// character.
    pub fn add_item(&mut self, id: &EntityId, item: &str, quantity: u32) -> Result<u32, DomainError> {
        if quantity == 0 {
            return Err(DomainError::Validation("quantity must be positive".to_owned()));
        }
        let character = self.character_mut(id)?;
        if let Some(stack) = character
            .inventory
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(item))
        {
            stack.quantity = stack.quantity.checked_add(quantity).ok_or_else(|| {
                DomainError::Validation(format!("{item} stack cannot grow by {quantity}"))
            })?;
            return Ok(stack.quantity);
        }
        character.inventory.push(InventoryItem {
            name: item.to_owned(),
            quantity,
        });
        Ok(quantity)
    }

    /// Removes items from a character's inventory and returns what is left.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the character does not carry
    /// enough of the item, and `DomainError::EntityNotFound` for an unknown
    /// character.
    pub fn remove_item(
        &mut self,
        id: &EntityId,
        item: &str,
        quantity: u32,
    ) -> Result<u32, DomainError> {
        let character = self.character_mut(id)?;
        let index = character
            .inventory
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(item))
            .ok_or_else(|| DomainError::Validation(format!("{} does not carry {item}", character.name)))?;
        let stack = &mut character.inventory[index];
        if stack.quantity < quantity {
            return Err(DomainError::Validation(format!(
                "{} carries only {} of {item}",
                character.name, stack.quantity
            )));
        }
        stack.quantity -= quantity;
        let remaining = stack.quantity;
        if remaining == 0 {
            character.inventory.remove(index);
        }
        Ok(remaining)
    }

    /// Appends a message to the conversation record. Player messages open a
    /// new conversation turn.
    pub fn record_message(
        &mut self,
        speaker: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> u32 {
        if role == MessageRole::Player {
            self.turn += 1;
        }
        self.conversation.push(ConversationMessage {
            speaker: speaker.into(),
            role,
            content: content.into(),
            turn: self.turn,
            recorded_at: now,
        });
        self.turn
    }

    /// The last `count` conversation messages, oldest first.
    #[must_use]
    pub fn recent_messages(&self, count: usize) -> &[ConversationMessage] {
        let start = self.conversation.len().saturating_sub(count);
        &self.conversation[start..]
    }

    /// Removes a non-player character from the session, the party, and the
    /// dialogue pin.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for the player or an active combat
    /// participant, and `DomainError::EntityNotFound` for an unknown id.
    pub fn remove_character(&mut self, id: &EntityId) -> Result<Character, DomainError> {
        if *id == self.player_id {
            return Err(DomainError::Validation(
                "the player character cannot be removed".to_owned(),
            ));
        }
        if self.combat.is_active && self.combat.participant(id).is_some_and(|p| p.is_active) {
            return Err(DomainError::Validation(format!(
                "{id} is still fighting and cannot leave"
            )));
        }
        let character = self
            .characters
            .remove(id)
            .ok_or_else(|| DomainError::EntityNotFound(id.clone()))?;
        self.party.retain(|member| member != id);
        if let Some(dialogue) = &mut self.dialogue {
            dialogue.target_ids.retain(|target| target != id);
            if dialogue.target_ids.is_empty() {
                self.dialogue = None;
            }
        }
        Ok(character)
    }
}
