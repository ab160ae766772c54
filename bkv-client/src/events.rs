//! # Push Event Fan-Out
//!
//! Purpose: Deliver push-style events (subscription confirmations, channel
//! and pattern messages, background errors) to any number of consumers.
//!
//! ## Guarantees
//!
//! - **At-most-once delivery**: a receiver that lags past the channel
//!   capacity misses events rather than blocking the poll workers.
//! - **In-memory only**: events are not persisted or replayed.
//! - **Per-channel order**: events for one channel are emitted in the order
//!   the servicing worker dispatched them.

use bytes::Bytes;
use tokio::sync::broadcast;

/// Default capacity of the event channel.
const DEFAULT_CAPACITY: usize = 1024;

/// A push-style event at the public boundary.
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// A `subscribe` call took effect; `count` is the number of distinct
    /// exact subscriptions after the mutation.
    Subscribed { channel: String, count: usize },
    /// An `unsubscribe` call took effect (or was a no-op on an unknown
    /// channel; the count is then unchanged).
    Unsubscribed { channel: String, count: usize },
    /// A `psubscribe` call took effect; `count` counts distinct patterns.
    PSubscribed { pattern: String, count: usize },
    /// A `punsubscribe` call took effect.
    PUnsubscribed { pattern: String, count: usize },
    /// A delivery matching an exact subscription.
    Message { channel: String, payload: Bytes },
    /// A delivery matching a pattern subscription.
    PMessage {
        pattern: String,
        channel: String,
        payload: Bytes,
    },
    /// A background failure with no natural per-call slot: persistent poll
    /// failures, subscription-connection rebuild failures.
    Error { message: String },
}

/// Broadcast bus carrying [`PushEvent`]s to all subscribed receivers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PushEvent>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus with an explicit buffer capacity.
    pub fn with_capacity(capacity: usize) -> EventBus {
        let (sender, _) = broadcast::channel(capacity);
        EventBus { sender }
    }

    /// Opens a new receiver; it observes events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.sender.subscribe()
    }

    /// Emits an event to all receivers (fire-and-forget).
    ///
    /// Returns the number of receivers that got the event; zero when
    /// nobody is listening, which is not an error.
    pub fn emit(&self, event: PushEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}
