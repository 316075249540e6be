//! Pull-based narrator output.
//!
//! A narrator pushes `StreamEvent`s into a bounded channel; the caller pulls
//! them one at a time with `NarratorStream::next`. The stream is single-pass
//! and ends at the first `Complete` or `Error`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// One unit of narrator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Narrative text meant for the player.
    Chunk(String),
    /// Private reasoning; never shown to the player.
    Thinking(String),
    /// The narrator finished; the payload is provider-specific.
    Complete(Value),
    /// The narrator failed with a human-readable message.
    Error(String),
}

impl StreamEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_))
    }
}

/// Producer half handed to the narrator implementation.
#[derive(Debug, Clone)]
pub struct StreamSink {
    sender: mpsc::Sender<StreamEvent>,
}

impl StreamSink {
    /// Sends an event, waiting for buffer space. Returns `false` once the
    /// consumer has dropped the stream.
    pub async fn send(&self, event: StreamEvent) -> bool {
        self.sender.send(event).await.is_ok()
    }

    /// Convenience for a text chunk.
    pub async fn chunk(&self, text: impl Into<String>) -> bool {
        self.send(StreamEvent::Chunk(text.into())).await
    }
}

/// Consumer half: the narrator's output as a pull-based sequence.
#[derive(Debug)]
pub struct NarratorStream {
    receiver: mpsc::Receiver<StreamEvent>,
    finished: bool,
}

impl NarratorStream {
    /// Creates a connected sink and stream with room for `capacity` events.
    #[must_use]
    pub fn channel(capacity: usize) -> (StreamSink, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            StreamSink { sender },
            Self {
                receiver,
                finished: false,
            },
        )
    }

    /// A stream that yields the given events and then closes.
    #[must_use]
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        let (sender, receiver) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity matches the event count, so this never fails.
            let _ = sender.try_send(event);
        }
        Self {
            receiver,
            finished: false,
        }
    }

    /// Pulls the next event.
    ///
    /// Returns `None` after a terminal event. A producer that disappears
    /// without finishing yields one synthetic `Error`.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        let event = self.receiver.recv().await.unwrap_or_else(|| {
            StreamEvent::Error("narrator stream ended without completing".to_owned())
        });
        if event.is_terminal() {
            self.finished = true;
            self.receiver.close();
        }
        Some(event)
    }
}
