//! Routing heuristics: who the player is talking to, and which tools the
//! input hints at.
//!
//! Matching is ASCII case-insensitive and respects word boundaries.

use loremaster_core::combat::EntityType;
use loremaster_core::ids::EntityId;
use loremaster_core::session::GameSession;
use loremaster_narrator::domain::tools::{Tool, ToolScope};

const ADDRESS_PHRASES: [&str; 7] = [
    "ask", "tell", "say to", "talk to", "speak to", "speak with", "greet",
];

const TOOL_KEYWORDS: &[(Tool, &[&str])] = &[
    (
        Tool::StartCombat,
        &["attack", "fight", "ambush", "charge at", "draw my"],
    ),
    (
        Tool::ApplyHpDelta,
        &["hit", "strike", "stab", "slash", "shoot", "heal", "bandage"],
    ),
    (
        Tool::RollDice,
        &["roll", "check", "try to", "attempt", "sneak", "persuade", "climb", "search"],
    ),
    (Tool::AddItem, &["take", "pick up", "loot", "grab", "buy"]),
    (Tool::RemoveItem, &["give", "drop", "sell", "drink", "use"]),
    (Tool::AdvanceTime, &["rest", "sleep", "wait", "camp"]),
    (
        Tool::MoveParty,
        &["travel", "go to", "head to", "walk to", "enter", "leave"],
    ),
    (Tool::StartQuest, &["quest", "job", "bounty", "task"]),
    (Tool::UpdateQuest, &["complete", "finished", "give up on"]),
    (Tool::AddPartyMember, &["join", "recruit", "hire"]),
    (Tool::RemovePartyMember, &["dismiss", "part ways"]),
    (Tool::NextTurn, &["end my turn", "pass", "done"]),
    (Tool::EndCombat, &["flee", "surrender", "yield"]),
];

fn is_word_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'\''
}

fn boundary_before(text: &[u8], at: usize) -> bool {
    at == 0 || !is_word_char(text[at - 1])
}

fn boundary_after(text: &[u8], end: usize) -> bool {
    end >= text.len() || !is_word_char(text[end])
}

/// Byte offsets just past every word-bounded occurrence of `phrase`.
fn phrase_ends(lower: &str, phrase: &str) -> Vec<usize> {
    let bytes = lower.as_bytes();
    lower
        .match_indices(phrase)
        .filter(|(at, _)| boundary_before(bytes, *at) && boundary_after(bytes, at + phrase.len()))
        .map(|(at, _)| at + phrase.len())
        .collect()
}

fn contains_phrase(lower: &str, phrase: &str) -> bool {
    !phrase_ends(lower, phrase).is_empty()
}

/// Characters the player can hold a conversation with: non-player,
/// non-monster.
fn addressable(session: &GameSession) -> Vec<(EntityId, String)> {
    session
        .characters
        .values()
        .filter(|c| c.entity_type == EntityType::Npc)
        .map(|c| (c.id.clone(), c.name.to_ascii_lowercase()))
        .collect()
}

/// The longest candidate name `rest` starts with, and its length.
fn name_at(rest: &str, candidates: &[(EntityId, String)]) -> Option<(EntityId, usize)> {
    let bytes = rest.as_bytes();
    candidates
        .iter()
        .filter(|(_, name)| {
            !name.is_empty() && rest.starts_with(name.as_str()) && boundary_after(bytes, name.len())
        })
        .max_by_key(|(_, name)| name.len())
        .map(|(id, name)| (id.clone(), name.len()))
}

/// Non-player characters the input explicitly addresses, in order of first
/// mention.
///
/// Recognised forms: `@Name`, a leading `Name,` or `Name:`, and
/// `ask|tell|say to|talk to|speak to|speak with|greet Name`.
#[must_use]
pub fn detect_dialogue_targets(input: &str, session: &GameSession) -> Vec<EntityId> {
    let candidates = addressable(session);
    if candidates.is_empty() {
        return Vec::new();
    }
    let lower = input.trim().to_ascii_lowercase();
    let mut found: Vec<(usize, EntityId)> = Vec::new();

    if let Some((id, len)) = name_at(&lower, &candidates) {
        let after = lower[len..].trim_start();
        if after.starts_with(',') || after.starts_with(':') {
            found.push((0, id));
        }
    }

    for (at, _) in lower.match_indices('@') {
        if let Some((id, _)) = name_at(&lower[at + 1..], &candidates) {
            found.push((at, id));
        }
    }

    for phrase in ADDRESS_PHRASES {
        for end in phrase_ends(&lower, phrase) {
            let rest = &lower[end..];
            let trimmed = rest.trim_start();
            if trimmed.len() == rest.len() {
                continue;
            }
            if let Some((id, _)) = name_at(trimmed, &candidates) {
                found.push((end, id));
            }
        }
    }

    found.sort_by_key(|(at, _)| *at);
    let mut targets: Vec<EntityId> = Vec::new();
    for (_, id) in found {
        if !targets.contains(&id) {
            targets.push(id);
        }
    }
    targets
}

/// Tools the input hints at, restricted to `scope`, in catalog order.
#[must_use]
pub fn suggest_tools(input: &str, scope: &ToolScope) -> Vec<Tool> {
    let lower = input.to_ascii_lowercase();
    let mut tools: Vec<Tool> = TOOL_KEYWORDS
        .iter()
        .filter(|(tool, keywords)| {
            scope.allows(*tool) && keywords.iter().any(|k| contains_phrase(&lower, k))
        })
        .map(|(tool, _)| *tool)
        .collect();
    tools.sort_unstable();
    tools.dedup();
    tools
}
