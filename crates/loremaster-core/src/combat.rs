//! Combat turn-order state.
//!
//! `CombatState` is the initiative automaton the combat handler drives. It
//! knows nothing about narrators or prompts; it only guarantees that the turn
//! pointer always lands on a participant who is still in the fight.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::EntityId;

/// What kind of entity a participant references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// The human-controlled character.
    Player,
    /// A named non-player character.
    Npc,
    /// A monster from the bestiary.
    Monster,
}

/// Which side of the fight a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    /// The human player.
    Player,
    /// Non-player characters fighting alongside the player.
    Ally,
    /// The opposing side.
    Enemy,
}

/// An entry in the initiative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Reference into the session's character collection.
    pub entity_id: EntityId,
    /// Kind of entity referenced.
    pub entity_type: EntityType,
    /// Side of the fight.
    pub faction: Faction,
    /// Initiative roll; higher acts first.
    pub initiative: i32,
    /// `false` once the participant has been removed from the rotation.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Participant {
    /// Creates an active participant.
    #[must_use]
    pub fn new(
        entity_id: impl Into<EntityId>,
        entity_type: EntityType,
        faction: Faction,
        initiative: i32,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type,
            faction,
            initiative,
            is_active: true,
        }
    }
}

/// Where the turn pointer landed after an advance or a removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPosition {
    /// Current round, starting at 1.
    pub round_number: u32,
    /// Index into the participant list.
    pub turn_index: usize,
    /// The participant whose turn it now is.
    pub entity_id: EntityId,
    /// Whether the rotation wrapped into a new round.
    pub new_round: bool,
}

/// Outcome of an ended encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSummary {
    /// Number of rounds fought.
    pub rounds: u32,
    /// Participants still standing at the end.
    pub survivors: Vec<EntityId>,
}

/// The turn-order aggregate for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    /// Whether an encounter is in progress.
    pub is_active: bool,
    /// Current round; 0 before the first encounter.
    pub round_number: u32,
    /// Position of the acting participant.
    pub turn_index: usize,
    /// Initiative order, fixed for the encounter.
    pub participants: Vec<Participant>,
}

impl CombatState {
    /// Starts an encounter.
    ///
    /// Participants are ordered by initiative descending; ties keep their
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if combat is already active, if the
    /// list is empty, or if it does not contain exactly one player-faction
    /// participant.
    pub fn start(&mut self, mut participants: Vec<Participant>) -> Result<TurnPosition, DomainError> {
        if self.is_active {
            return Err(DomainError::Validation("combat is already active".to_owned()));
        }
        if participants.is_empty() {
            return Err(DomainError::Validation(
                "combat requires at least one participant".to_owned(),
            ));
        }
        let players = participants
            .iter()
            .filter(|p| p.faction == Faction::Player)
            .count();
        if players != 1 {
            return Err(DomainError::Validation(format!(
                "combat requires exactly one player participant, found {players}"
            )));
        }

        for participant in &mut participants {
            participant.is_active = true;
        }
        // `sort_by` is stable, so equal initiatives keep insertion order.
        participants.sort_by(|a, b| b.initiative.cmp(&a.initiative));

        self.participants = participants;
        self.is_active = true;
        self.round_number = 1;
        self.turn_index = 0;

        Ok(TurnPosition {
            round_number: 1,
            turn_index: 0,
            entity_id: self.participants[0].entity_id.clone(),
            new_round: true,
        })
    }

    /// Moves the turn to the next active participant, wrapping into a new
    /// round when the rotation completes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if combat is not active or nobody is
    /// left in the rotation.
    pub fn advance_turn(&mut self) -> Result<TurnPosition, DomainError> {
        if !self.is_active {
            return Err(DomainError::Validation("combat is not active".to_owned()));
        }
        self.move_to_next_active()
    }

    /// Takes a participant out of the rotation. The entry is kept with
    /// `is_active = false`. Returns the new turn position when the removed
    /// participant held the turn.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if combat is not active or the
    /// participant is the last one standing, and `DomainError::EntityNotFound`
    /// if the entity is not in the initiative order.
    pub fn remove_participant(
        &mut self,
        entity_id: &EntityId,
    ) -> Result<Option<TurnPosition>, DomainError> {
        if !self.is_active {
            return Err(DomainError::Validation("combat is not active".to_owned()));
        }
        let index = self
            .participants
            .iter()
            .position(|p| &p.entity_id == entity_id)
            .ok_or_else(|| DomainError::EntityNotFound(entity_id.clone()))?;

        if !self.participants[index].is_active {
            return Ok(None);
        }
        if self.active_participants().count() == 1 {
            return Err(DomainError::Validation(
                "cannot remove the last active participant".to_owned(),
            ));
        }

        self.participants[index].is_active = false;
        if index == self.turn_index {
            return self.move_to_next_active().map(Some);
        }
        Ok(None)
    }

    /// Ends the encounter.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if combat is not active.
    pub fn end(&mut self) -> Result<CombatSummary, DomainError> {
        if !self.is_active {
            return Err(DomainError::Validation("combat is not active".to_owned()));
        }
        self.is_active = false;
        Ok(CombatSummary {
            rounds: self.round_number,
            survivors: self
                .active_participants()
                .map(|p| p.entity_id.clone())
                .collect(),
        })
    }

    /// The participant whose turn it is, if combat is active.
    #[must_use]
    pub fn current(&self) -> Option<&Participant> {
        if !self.is_active {
            return None;
        }
        self.participants.get(self.turn_index)
    }

    /// Participants still in the rotation, in initiative order.
    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_active)
    }

    /// Number of active participants on a side.
    #[must_use]
    pub fn active_in_faction(&self, faction: Faction) -> usize {
        self.active_participants()
            .filter(|p| p.faction == faction)
            .count()
    }

    /// Looks up a participant by entity id.
    #[must_use]
    pub fn participant(&self, entity_id: &EntityId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.entity_id == entity_id)
    }

    fn move_to_next_active(&mut self) -> Result<TurnPosition, DomainError> {
        let len = self.participants.len();
        let mut new_round = false;
        for step in 1..=len {
            let raw = self.turn_index + step;
            if raw >= len {
                new_round = true;
            }
            let index = raw % len;
            if self.participants[index].is_active {
                if new_round {
                    self.round_number += 1;
                }
                self.turn_index = index;
                return Ok(TurnPosition {
                    round_number: self.round_number,
                    turn_index: index,
                    entity_id: self.participants[index].entity_id.clone(),
                    new_round,
                });
            }
        }
        Err(DomainError::Validation(
            "no active participants remain".to_owned(),
        ))
    }
}
