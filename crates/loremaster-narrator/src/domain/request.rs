//! What a narrator is asked to work on.

use loremaster_core::session::GameSession;
use uuid::Uuid;

use super::role::NarratorRole;
use crate::application::runtime::ToolRuntime;

/// One narrator invocation.
#[derive(Debug, Clone)]
pub struct NarratorRequest {
    /// Session being played.
    pub session_id: Uuid,
    /// Why the narrator is being invoked.
    pub role: NarratorRole,
    /// Player input or synthesized prompt.
    pub input: String,
    /// Persona block for a shared minor-character narrator.
    pub persona: Option<String>,
    /// Rendered working context.
    pub context: String,
    /// Session state as of the invocation.
    pub session: GameSession,
    /// Capability-scoped access to the dispatcher.
    pub tools: ToolRuntime,
}
