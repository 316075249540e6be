//! Events published on the session broadcast stream.

use loremaster_core::ids::EntityId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of a broadcast event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BroadcastKind {
    /// A slice of narrator output.
    NarrativeChunk {
        /// Who is speaking.
        speaker: String,
        /// Text of the chunk.
        content: String,
    },
    /// A narrator invoked a tool.
    ToolCall {
        /// Tool name.
        tool: String,
        /// Structured arguments.
        arguments: serde_json::Value,
    },
    /// A tool returned to the narrator.
    ToolResult {
        /// Tool name.
        tool: String,
        /// Structured result.
        result: serde_json::Value,
    },
    /// Engine notice, such as a narrator handoff bridge.
    System {
        /// Message text.
        message: String,
    },
    /// A proposed action for an allied participant, awaiting a human decision.
    Suggestion {
        /// The ally the suggestion is for.
        entity_id: EntityId,
        /// Suggested action.
        suggestion: String,
    },
    /// A user-visible failure.
    Error {
        /// Human-readable message.
        message: String,
    },
}

/// An event as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    /// Session the event belongs to.
    pub session_id: Uuid,
    /// Emission order within the session, starting at 1.
    pub sequence: u64,
    /// Event payload.
    pub kind: BroadcastKind,
}
