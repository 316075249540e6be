//! Capability contracts implemented by narrator and summarizer providers.

use async_trait::async_trait;
use loremaster_core::conversation::ConversationMessage;
use uuid::Uuid;

use crate::domain::request::NarratorRequest;
use crate::domain::role::NarratorRole;
use crate::domain::stream::NarratorStream;
use crate::error::NarratorError;

/// A provider that turns a request into a stream of events.
///
/// The engine invokes a narrator at most once at a time per session and
/// drains the stream until it completes or fails.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Starts producing output for `request`.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Generation` if the provider cannot start.
    /// Failures after the stream has started arrive as `StreamEvent::Error`.
    async fn process(&self, request: NarratorRequest) -> Result<NarratorStream, NarratorError>;
}

/// Input to a transition summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    /// Session being played.
    pub session_id: Uuid,
    /// Narrator handing over.
    pub from: NarratorRole,
    /// Narrator taking over.
    pub to: NarratorRole,
    /// The outgoing narrator's recent messages, oldest first.
    pub messages: Vec<ConversationMessage>,
}

/// Condenses recent conversation into a short bridge for the next narrator.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns a summary of two or three sentences.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Summary` when no summary could be produced.
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, NarratorError>;
}
