//! # Event Dispatcher
//!
//! Purpose: Turn one pulled message into zero, one, or many push events —
//! one per matching subscription — without touching a live connection, so
//! fan-out is testable in isolation.
//!
//! Exact matches only ever produce `Message` events and pattern matches
//! only ever produce `PMessage` events. For a delivery the backend has
//! already attributed to a pattern, only that pattern fires; unattributed
//! deliveries are matched here against every active subscription.

use std::sync::Arc;

use parking_lot::RwLock;

use bkv_common::{glob_match, Message};

use crate::events::{EventBus, PushEvent};
use crate::registry::SubscriptionRegistry;

/// Matches pulled messages against the registry and emits push events.
#[derive(Clone)]
pub struct EventDispatcher {
    registry: Arc<RwLock<SubscriptionRegistry>>,
    bus: EventBus,
}

impl EventDispatcher {
    pub fn new(registry: Arc<RwLock<SubscriptionRegistry>>, bus: EventBus) -> EventDispatcher {
        EventDispatcher { registry, bus }
    }

    /// Fans a message out to every matching subscription.
    ///
    /// Returns the number of events emitted; zero is normal for messages
    /// whose subscription was removed after the connection was provisioned.
    pub fn dispatch(&self, message: &Message) -> usize {
        // Snapshot under the lock, emit outside it.
        let active = self.registry.read().active_set();

        let mut emitted = 0;
        if let Some(pattern) = &message.pattern {
            if active.patterns.iter().any(|p| p == pattern)
                && glob_match(pattern, &message.channel)
            {
                self.bus.emit(PushEvent::PMessage {
                    pattern: pattern.clone(),
                    channel: message.channel.clone(),
                    payload: message.payload.clone(),
                });
                emitted += 1;
            }
            return emitted;
        }

        if active.channels.iter().any(|c| c == &message.channel) {
            self.bus.emit(PushEvent::Message {
                channel: message.channel.clone(),
                payload: message.payload.clone(),
            });
            emitted += 1;
        }
        for pattern in &active.patterns {
            if glob_match(pattern, &message.channel) {
                self.bus.emit(PushEvent::PMessage {
                    pattern: pattern.clone(),
                    channel: message.channel.clone(),
                    payload: message.payload.clone(),
                });
                emitted += 1;
            }
        }
        emitted
    }
}
