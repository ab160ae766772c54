//! # Pub/Sub Messages
//!
//! A message pulled from a subscription connection. Transient: produced by
//! one poll worker, consumed once by the dispatcher.

use bytes::Bytes;

/// One pub/sub delivery from the underlying client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Channel the message was published to.
    pub channel: String,
    /// Raw payload bytes.
    pub payload: Bytes,
    /// Set when the backend attributes the delivery to a specific pattern
    /// subscription; `None` for unattributed deliveries, which the
    /// dispatcher fans out itself.
    pub pattern: Option<String>,
}

impl Message {
    /// Creates an unattributed message.
    pub fn new(channel: impl Into<String>, payload: impl Into<Bytes>) -> Message {
        Message {
            channel: channel.into(),
            payload: payload.into(),
            pattern: None,
        }
    }
}
