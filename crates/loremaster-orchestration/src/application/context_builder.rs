//! Renders session state into narrator-ready text.

use std::fmt::Write as _;

use loremaster_combat::domain::prompts::roster;
use loremaster_core::session::{GameSession, QuestStatus};
use loremaster_narrator::domain::role::NarratorRole;

/// Turns a session snapshot into the working context of a narrator.
pub trait ContextBuilder: Send + Sync {
    /// Renders the context for a narrator playing `role`.
    fn render(&self, session: &GameSession, role: NarratorRole) -> String;
}

/// Plain-text renderer covering location, time, party, quests, combat, and
/// the recent conversation.
#[derive(Debug, Clone, Copy)]
pub struct DefaultContextBuilder {
    /// Conversation messages to include.
    pub recent_messages: usize,
}

impl Default for DefaultContextBuilder {
    fn default() -> Self {
        Self { recent_messages: 8 }
    }
}

impl ContextBuilder for DefaultContextBuilder {
    fn render(&self, session: &GameSession, role: NarratorRole) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Location: {}",
            session.location.as_deref().unwrap_or("unknown")
        );
        let _ = writeln!(out, "Time: {}", session.game_time.label());

        if let Ok(player) = session.character(&session.player_id) {
            let _ = writeln!(
                out,
                "Player: {} ({}/{} HP)",
                player.name, player.hp, player.max_hp
            );
        }

        let party: Vec<&str> = session
            .party
            .iter()
            .filter_map(|id| session.character(id).ok())
            .map(|c| c.name.as_str())
            .collect();
        if !party.is_empty() {
            let _ = writeln!(out, "Party: {}", party.join(", "));
        }

        let quests: Vec<&str> = session
            .quests
            .values()
            .filter(|q| q.status == QuestStatus::Active)
            .map(|q| q.title.as_str())
            .collect();
        if !quests.is_empty() {
            let _ = writeln!(out, "Active quests: {}", quests.join("; "));
        }

        if role == NarratorRole::Dialogue {
            if let Some(dialogue) = &session.dialogue {
                let names: Vec<&str> = dialogue
                    .target_ids
                    .iter()
                    .filter_map(|id| session.character(id).ok())
                    .map(|c| c.name.as_str())
                    .collect();
                let _ = writeln!(out, "In conversation with: {}", names.join(", "));
            }
        }

        if session.combat.is_active {
            let _ = write!(
                out,
                "Combat, round {}:\n{}",
                session.combat.round_number,
                roster(session)
            );
        }

        let recent = session.recent_messages(self.recent_messages);
        if !recent.is_empty() {
            out.push_str("Recent conversation:\n");
            for message in recent {
                let _ = writeln!(out, "{}: {}", message.speaker, message.content);
            }
        }
        out
    }
}
