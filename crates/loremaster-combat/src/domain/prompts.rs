//! Prompts the scheduler synthesizes for narrators.

use std::fmt::Write as _;

use loremaster_core::combat::{Faction, Participant};
use loremaster_core::ids::EntityId;
use loremaster_core::session::GameSession;

use super::phase::TurnMarker;

fn display_name(session: &GameSession, entity_id: &EntityId) -> String {
    session
        .character(entity_id)
        .map_or_else(|_| entity_id.to_string(), |c| c.name.clone())
}

fn faction_label(faction: Faction) -> &'static str {
    match faction {
        Faction::Player => "player",
        Faction::Ally => "ally",
        Faction::Enemy => "enemy",
    }
}

/// One line per combatant still standing, in initiative order.
#[must_use]
pub fn roster(session: &GameSession) -> String {
    let mut out = String::new();
    for participant in session.combat.active_participants() {
        let name = display_name(session, &participant.entity_id);
        let _ = match session.character(&participant.entity_id) {
            Ok(c) => writeln!(
                out,
                "- {name} [{}] ({}) {}/{} HP",
                participant.entity_id,
                faction_label(participant.faction),
                c.hp,
                c.max_hp
            ),
            Err(_) => writeln!(
                out,
                "- {name} ({})",
                faction_label(participant.faction)
            ),
        };
    }
    out
}

/// Prompt for the combat narrator to resolve a non-player turn.
///
/// `last` is the turn the loop prompted before. When it equals the current
/// turn the narrator did not pass the turn on, and the prompt says so.
#[must_use]
pub fn turn_prompt(session: &GameSession, last: Option<&TurnMarker>) -> String {
    let Some(current) = session.combat.current() else {
        return "Combat is not active.".to_owned();
    };
    let round = session.combat.round_number;
    let name = display_name(session, &current.entity_id);

    let mut prompt = format!(
        "Round {round}. It is {name}'s turn ({}).\n",
        faction_label(current.faction)
    );
    match last {
        Some(marker) if marker.entity_id == current.entity_id && marker.round_number == round => {
            let _ = writeln!(
                prompt,
                "You were already asked to resolve this turn and did not call next_turn. \
                 Finish {name}'s action now and call next_turn."
            );
        }
        Some(marker) => {
            let _ = writeln!(
                prompt,
                "Last to act: {} in round {}.",
                display_name(session, &marker.entity_id),
                marker.round_number
            );
        }
        None => {}
    }
    let _ = write!(
        prompt,
        "Resolve {name}'s action, apply its effects with your tools, then call next_turn.\n\
         Combatants:\n{}",
        roster(session)
    );
    prompt
}

/// Prompt for the combat narrator once no enemy remains.
#[must_use]
pub fn end_prompt(session: &GameSession) -> String {
    format!(
        "No enemies remain standing after round {}. Describe how the fight ends, \
         then call end_combat.\nStill standing:\n{}",
        session.combat.round_number,
        roster(session)
    )
}

/// Prompt asking an ally for a suggested action. The ally must not resolve
/// anything itself.
#[must_use]
pub fn ally_suggestion_prompt(session: &GameSession, ally: &Participant) -> String {
    let name = display_name(session, &ally.entity_id);
    let player = display_name(session, &session.player_id);
    format!(
        "You are {name}, fighting alongside {player}. It is your turn in round {}. \
         In one or two sentences, suggest what you will do next. Do not resolve the \
         action; {player} decides.\nCombatants:\n{}",
        session.combat.round_number,
        roster(session)
    )
}
