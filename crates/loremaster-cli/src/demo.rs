//! Offline stand-ins for the model-backed collaborators.
//!
//! The offline narrator resolves combat with real dice through its tools,
//! so every engine path (tool scopes, triggered removals, handoffs, the
//! auto-continuation loop) runs without a model.

use std::sync::Arc;

use async_trait::async_trait;
use loremaster_core::combat::{EntityType, Faction, Participant};
use loremaster_core::conversation::MessageRole;
use loremaster_core::ids::EntityId;
use loremaster_core::session::{Character, GameSession, Importance};
use loremaster_narrator::application::cache::NarratorFactory;
use loremaster_narrator::application::narrator::{Narrator, Summarizer, SummaryRequest};
use loremaster_narrator::domain::request::NarratorRequest;
use loremaster_narrator::domain::role::NarratorRole;
use loremaster_narrator::domain::stream::{NarratorStream, StreamEvent, StreamSink};
use loremaster_narrator::domain::tools::{ToolCall, ToolResult};
use loremaster_narrator::error::NarratorError;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

const COMBAT_WORDS: [&str; 4] = ["attack", "fight", "ambush", "charge"];

/// The session the terminal opens with: Aria, the ranger Eldrin, Mira the
/// innkeeper, and a goblin lurking by the mill.
#[must_use]
pub fn opening_session() -> GameSession {
    let mut session = GameSession::new(
        Uuid::now_v7(),
        Character::new(EntityId::new("hero"), "Aria", EntityType::Player, 20),
    );
    session.add_character(
        Character::new(EntityId::new("eldrin"), "Eldrin", EntityType::Npc, 16)
            .with_importance(Importance::Major)
            .with_persona("A weathered elven ranger, loyal and laconic."),
    );
    session.add_character(
        Character::new(EntityId::new("mira"), "Mira", EntityType::Npc, 8)
            .with_persona("A cheerful innkeeper who knows every rumour."),
    );
    session.add_character(Character::new(
        EntityId::new("goblin"),
        "Goblin",
        EntityType::Monster,
        7,
    ));
    session.party.push(EntityId::new("eldrin"));
    session.location = Some("Old Mill".to_owned());
    session
}

/// A rule-driven narrator that streams short lines and drives combat
/// through its tools.
#[derive(Debug, Clone, Copy)]
pub struct OfflineNarrator {
    capacity: usize,
}

impl OfflineNarrator {
    /// Creates a narrator whose streams buffer `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

#[async_trait]
impl Narrator for OfflineNarrator {
    async fn process(&self, request: NarratorRequest) -> Result<NarratorStream, NarratorError> {
        let (sink, stream) = NarratorStream::channel(self.capacity);
        tokio::spawn(async move {
            let calls = match request.role {
                NarratorRole::Narrative => narrate(&request, &sink).await,
                NarratorRole::Combat => resolve(&request, &sink).await,
                NarratorRole::Dialogue => {
                    sink.chunk(reply(&request)).await;
                    0
                }
                NarratorRole::AllySuggestion => {
                    sink.chunk("I'll strike at the nearest foe.").await;
                    0
                }
            };
            debug!(session_id = %request.session_id, role = %request.role, calls, "offline turn finished");
            sink.send(StreamEvent::Complete(json!({ "tool_calls": calls })))
                .await;
        });
        Ok(stream)
    }
}

async fn call(request: &NarratorRequest, name: &str, arguments: Value) -> ToolResult {
    request.tools.invoke(&ToolCall::new(name, arguments)).await
}

fn reply(request: &NarratorRequest) -> String {
    let speaker = request
        .persona
        .as_deref()
        .and_then(|p| p.strip_prefix("You are "))
        .and_then(|p| p.split('.').next())
        .unwrap_or("The stranger");
    format!("{speaker} considers your words. \"{}\" they repeat, thoughtfully.", request.input.trim())
}

/// Starts combat when the input sounds hostile and a monster is present.
async fn narrate(request: &NarratorRequest, sink: &StreamSink) -> usize {
    let session = &request.session;
    let lowered = request.input.to_lowercase();
    let hostile = COMBAT_WORDS.iter().any(|w| lowered.contains(w));
    if !hostile || session.combat.is_active {
        sink.chunk(format!(
            "You {}. The {} is quiet for now.",
            request.input.trim().trim_end_matches('.'),
            session.location.as_deref().unwrap_or("road")
        ))
        .await;
        return 0;
    }

    let participants = participants_for(session);
    if !participants.iter().any(|p| p.faction == Faction::Enemy) {
        sink.chunk("There is nothing here to fight.").await;
        return 0;
    }
    sink.chunk("Weapons are drawn!").await;
    call(request, "start_combat", json!({ "participants": participants })).await;
    1
}

fn participants_for(session: &GameSession) -> Vec<Participant> {
    let mut initiative = 15;
    let mut next = || {
        initiative -= 1;
        initiative + 1
    };
    let mut participants = vec![Participant::new(
        session.player_id.clone(),
        EntityType::Player,
        Faction::Player,
        next(),
    )];
    for id in &session.party {
        if let Ok(c) = session.character(id) {
            participants.push(Participant::new(id.clone(), c.entity_type, Faction::Ally, next()));
        }
    }
    for c in session.characters.values() {
        if c.entity_type == EntityType::Monster && c.hp > 0 {
            participants.push(Participant::new(c.id.clone(), c.entity_type, Faction::Enemy, next()));
        }
    }
    participants
}

/// Resolves the current turn: the attacker rolls, damage is applied, and
/// the turn passes on.
async fn resolve(request: &NarratorRequest, sink: &StreamSink) -> usize {
    let session = &request.session;
    if request.input.contains("call end_combat") {
        sink.chunk("The last foe falls, and silence returns.").await;
        call(request, "end_combat", json!({ "reason": "no enemies remain" })).await;
        return 1;
    }
    if request.input.starts_with("Combat has begun") {
        sink.chunk("Combat begins!").await;
        return 0;
    }
    let Some(current) = session.combat.current() else {
        sink.chunk("There is no fight to resolve.").await;
        return 0;
    };

    let target = if current.faction == Faction::Enemy {
        Some(session.player_id.clone())
    } else {
        session
            .combat
            .active_participants()
            .find(|p| p.faction == Faction::Enemy)
            .map(|p| p.entity_id.clone())
    };
    let name = |id: &EntityId| {
        session
            .character(id)
            .map_or_else(|_| id.to_string(), |c| c.name.clone())
    };

    let mut calls = 0;
    if let Some(target) = target {
        let roll = call(request, "roll_dice", json!({ "expression": "1d6", "purpose": "damage" })).await;
        calls += 1;
        let damage = match roll {
            ToolResult::Ok { result, .. } => result["roll"]["total"].as_i64().unwrap_or(1),
            _ => 1,
        };
        sink.chunk(format!(
            "{} strikes {} for {damage} damage. ",
            name(&current.entity_id),
            name(&target)
        ))
        .await;
        call(
            request,
            "apply_hp_delta",
            json!({ "entity_id": target, "delta": -damage, "reason": "attack" }),
        )
        .await;
        calls += 1;
    }
    call(request, "next_turn", json!({})).await;
    calls + 1
}

/// Hands every character the same offline narrator.
#[derive(Debug, Clone, Copy)]
pub struct OfflineFactory {
    capacity: usize,
}

impl OfflineFactory {
    /// Creates a factory whose narrators buffer `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl NarratorFactory for OfflineFactory {
    fn dedicated(&self, _session_id: Uuid, _character: &Character) -> Arc<dyn Narrator> {
        Arc::new(OfflineNarrator::new(self.capacity))
    }

    fn shared(&self, _session_id: Uuid) -> Arc<dyn Narrator> {
        Arc::new(OfflineNarrator::new(self.capacity))
    }
}

/// Summarizes a handoff by quoting the last narrator line.
#[derive(Debug, Clone, Copy)]
pub struct RecapSummarizer;

#[async_trait]
impl Summarizer for RecapSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, NarratorError> {
        request
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, MessageRole::Narrator | MessageRole::Combat))
            .map(|m| format!("Previously: {}", m.content))
            .ok_or_else(|| NarratorError::Summary("nothing to summarize".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_participants_cover_player_party_and_monsters() {
        // Arrange
        let session = opening_session();

        // Act
        let participants = participants_for(&session);

        // Assert
        let summary: Vec<(&str, Faction, i32)> = participants
            .iter()
            .map(|p| (p.entity_id.as_str(), p.faction, p.initiative))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("hero", Faction::Player, 15),
                ("eldrin", Faction::Ally, 14),
                ("goblin", Faction::Enemy, 13),
            ]
        );
    }

    #[tokio::test]
    async fn test_recap_quotes_last_narrator_line() {
        let mut session = opening_session();
        let now = Utc::now();
        session.record_message("Narrator", MessageRole::Narrator, "The mill creaks.", now);
        session.record_message("Aria", MessageRole::Player, "I listen.", now);
        let request = SummaryRequest {
            session_id: session.id,
            from: NarratorRole::Narrative,
            to: NarratorRole::Combat,
            messages: session.conversation.clone(),
        };

        let summary = RecapSummarizer.summarize(&request).await.unwrap();

        assert_eq!(summary, "Previously: The mill creaks.");
    }

    #[tokio::test]
    async fn test_recap_without_narration_fails() {
        let request = SummaryRequest {
            session_id: Uuid::new_v4(),
            from: NarratorRole::Combat,
            to: NarratorRole::Narrative,
            messages: Vec::new(),
        };

        let result = RecapSummarizer.summarize(&request).await;

        assert!(matches!(result, Err(NarratorError::Summary(_))));
    }
}
