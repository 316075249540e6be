//! Ready-made sessions.

use loremaster_core::combat::{EntityType, Faction, Participant};
use loremaster_core::ids::EntityId;
use loremaster_core::session::{Character, GameSession, Importance};
use uuid::Uuid;

/// The player character, Aria.
#[must_use]
pub fn hero() -> Character {
    Character::new(EntityId::new("hero"), "Aria", EntityType::Player, 20)
}

/// A session at the edge of the Old Mill: the player, the ranger Eldrin
/// (a major NPC travelling with the party), a goblin, and Mira the
/// innkeeper (a minor NPC).
#[must_use]
pub fn ambush_session() -> GameSession {
    let mut session = GameSession::new(Uuid::new_v4(), hero());
    session.add_character(
        Character::new(EntityId::new("eldrin"), "Eldrin", EntityType::Npc, 16)
            .with_importance(Importance::Major)
            .with_persona("A weathered elven ranger, loyal and laconic."),
    );
    session.add_character(Character::new(
        EntityId::new("goblin"),
        "Goblin",
        EntityType::Monster,
        7,
    ));
    session.add_character(
        Character::new(EntityId::new("mira"), "Mira", EntityType::Npc, 8)
            .with_persona("A cheerful innkeeper who knows every rumour."),
    );
    session.party.push(EntityId::new("eldrin"));
    session.location = Some("Old Mill".to_owned());
    session
}

/// Initiative order for the ambush: player 15, Eldrin 14, goblin 12.
#[must_use]
pub fn ambush_participants() -> Vec<Participant> {
    vec![
        Participant::new(EntityId::new("goblin"), EntityType::Monster, Faction::Enemy, 12),
        Participant::new(EntityId::new("hero"), EntityType::Player, Faction::Player, 15),
        Participant::new(EntityId::new("eldrin"), EntityType::Npc, Faction::Ally, 14),
    ]
}

/// The ambush session with combat already started.
///
/// # Panics
///
/// Panics if the fixture participants are rejected.
#[must_use]
pub fn ambush_in_combat() -> GameSession {
    let mut session = ambush_session();
    session
        .combat
        .start(ambush_participants())
        .expect("fixture participants start combat");
    session
}
