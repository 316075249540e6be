//! Session-scoped event stream.
//!
//! Consumers (UI, logs) subscribe per session and receive events in emission
//! order. Nothing here is durable; a subscriber that lags past the channel
//! capacity loses the oldest events.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::domain::events::{BroadcastEvent, BroadcastKind};

struct SessionChannel {
    sender: broadcast::Sender<BroadcastEvent>,
    next_sequence: u64,
}

/// Fan-out of broadcast events to per-session subscribers.
pub struct BroadcastHub {
    capacity: usize,
    channels: Mutex<HashMap<Uuid, SessionChannel>>,
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl BroadcastHub {
    /// Creates a hub whose per-session channels buffer `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn with_channel<T>(&self, session_id: Uuid, f: impl FnOnce(&mut SessionChannel) -> T) -> T {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let channel = channels.entry(session_id).or_insert_with(|| SessionChannel {
            sender: broadcast::channel(self.capacity).0,
            next_sequence: 1,
        });
        f(channel)
    }

    /// Subscribes to a session's events from now on.
    #[must_use]
    pub fn subscribe(&self, session_id: Uuid) -> broadcast::Receiver<BroadcastEvent> {
        self.with_channel(session_id, |channel| channel.sender.subscribe())
    }

    /// Publishes an event and returns its sequence number and how many
    /// subscribers received it.
    pub fn publish(&self, session_id: Uuid, kind: BroadcastKind) -> (u64, usize) {
        self.with_channel(session_id, |channel| {
            let sequence = channel.next_sequence;
            channel.next_sequence += 1;
            let event = BroadcastEvent {
                session_id,
                sequence,
                kind,
            };
            // Sending fails only when nobody is listening.
            let receivers = channel.sender.send(event).unwrap_or(0);
            debug!(%session_id, sequence, receivers, "broadcast event published");
            (sequence, receivers)
        })
    }

    /// Drops a session's channel; subscribers see the stream close.
    pub fn close(&self, session_id: Uuid) {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session_id);
    }
}
