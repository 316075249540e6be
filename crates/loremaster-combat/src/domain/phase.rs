//! Combat phases and per-turn decisions.

use loremaster_core::combat::{Faction, Participant};
use loremaster_core::ids::EntityId;
use loremaster_core::session::GameSession;
use serde::{Deserialize, Serialize};

/// Where the encounter stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatPhase {
    /// No encounter in progress.
    Inactive,
    /// Turns are being taken.
    Active {
        /// Whose turn it is.
        current: EntityId,
        /// Current round.
        round: u32,
    },
    /// Still active, but no enemy remains; waiting for the combat narrator
    /// to close the encounter.
    Ending,
}

/// What the next loop iteration must do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnDecision {
    /// Combat is not active.
    Inactive,
    /// No enemy remains; prompt the combat narrator to end combat.
    EndCombat,
    /// An ally acts; ask for a suggestion and wait for the player.
    AllySuggestion(Participant),
    /// The player acts.
    PlayerTurn(Participant),
    /// A non-player combatant acts; prompt the combat narrator.
    NpcTurn(Participant),
}

/// Identifies one turn: who acted, in which round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnMarker {
    /// The acting participant.
    pub entity_id: EntityId,
    /// The round it acted in.
    pub round_number: u32,
}

impl TurnMarker {
    /// The turn currently up, if combat is active.
    #[must_use]
    pub fn current(session: &GameSession) -> Option<Self> {
        session.combat.current().map(|participant| Self {
            entity_id: participant.entity_id.clone(),
            round_number: session.combat.round_number,
        })
    }
}

/// The phase of the session's encounter.
#[must_use]
pub fn phase(session: &GameSession) -> CombatPhase {
    let combat = &session.combat;
    if !combat.is_active {
        return CombatPhase::Inactive;
    }
    if combat.active_in_faction(Faction::Enemy) == 0 {
        return CombatPhase::Ending;
    }
    match combat.current() {
        Some(participant) => CombatPhase::Active {
            current: participant.entity_id.clone(),
            round: combat.round_number,
        },
        None => CombatPhase::Ending,
    }
}

/// Whether combat is active with no enemy left standing.
///
/// Detection never ends combat by itself; the combat narrator has to.
#[must_use]
pub fn should_end_combat(session: &GameSession) -> bool {
    phase(session) == CombatPhase::Ending
}

/// Decides what the current turn needs.
#[must_use]
pub fn next_decision(session: &GameSession) -> TurnDecision {
    if !session.combat.is_active {
        return TurnDecision::Inactive;
    }
    if should_end_combat(session) {
        return TurnDecision::EndCombat;
    }
    let Some(current) = session.combat.current().cloned() else {
        return TurnDecision::EndCombat;
    };
    match current.faction {
        Faction::Player => TurnDecision::PlayerTurn(current),
        Faction::Ally => TurnDecision::AllySuggestion(current),
        Faction::Enemy => TurnDecision::NpcTurn(current),
    }
}

#[cfg(test)]
mod tests {
    use loremaster_test_support::fixtures;

    use super::*;

    #[test]
    fn test_inactive_session_has_no_decision() {
        let session = fixtures::ambush_session();

        assert_eq!(phase(&session), CombatPhase::Inactive);
        assert_eq!(next_decision(&session), TurnDecision::Inactive);
        assert!(!should_end_combat(&session));
    }

    #[test]
    fn test_decisions_follow_initiative_order() {
        // Arrange
        let mut session = fixtures::ambush_in_combat();

        // Act
        let player = next_decision(&session);
        session.combat.advance_turn().unwrap();
        let ally = next_decision(&session);
        session.combat.advance_turn().unwrap();
        let goblin = next_decision(&session);

        // Assert
        assert!(matches!(player, TurnDecision::PlayerTurn(p) if p.entity_id.as_str() == "hero"));
        assert!(matches!(ally, TurnDecision::AllySuggestion(p) if p.entity_id.as_str() == "eldrin"));
        assert!(matches!(goblin, TurnDecision::NpcTurn(p) if p.entity_id.as_str() == "goblin"));
    }

    #[test]
    fn test_zero_enemies_means_ending_not_inactive() {
        // Arrange
        let mut session = fixtures::ambush_in_combat();

        // Act
        session
            .combat
            .remove_participant(&EntityId::new("goblin"))
            .unwrap();

        // Assert
        assert_eq!(phase(&session), CombatPhase::Ending);
        assert_eq!(next_decision(&session), TurnDecision::EndCombat);
        assert!(session.combat.is_active);
    }

    #[test]
    fn test_turn_marker_tracks_round() {
        let mut session = fixtures::ambush_in_combat();
        for _ in 0..3 {
            session.combat.advance_turn().unwrap();
        }

        let marker = TurnMarker::current(&session).unwrap();

        assert_eq!(marker.entity_id, EntityId::new("hero"));
        assert_eq!(marker.round_number, 2);
    }
}
