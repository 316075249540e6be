//! Conversation record kept on the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The human player.
    Player,
    /// The narrative narrator.
    Narrator,
    /// The combat narrator.
    Combat,
    /// A non-player character speaking in dialogue.
    Npc,
    /// Engine-generated bridge or notice.
    System,
}

/// One entry in the session's conversation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Display name of the speaker.
    pub speaker: String,
    /// Role of the speaker.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// Conversation turn the message belongs to.
    pub turn: u32,
    /// When the message was recorded.
    pub recorded_at: DateTime<Utc>,
}
