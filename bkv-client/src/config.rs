//! # Client Configuration
//!
//! Knobs for the mediation layer. Defaults match the behavior documented on
//! each field; embedders can deserialize a config from JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the bridge client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bound on each pull wait, in milliseconds. Also bounds worker
    /// shutdown latency, since the active flag is only re-checked between
    /// polls.
    pub poll_timeout_ms: u64,
    /// Capacity of the push-event broadcast channel. Slow consumers past
    /// this depth observe a lag error, never block the worker.
    pub event_capacity: usize,
    /// Consecutive poll failures before a background `Error` event is
    /// emitted. Transient failures below the threshold are only logged.
    pub error_report_threshold: u32,
}

impl ClientConfig {
    /// Poll bound as a `Duration`.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            poll_timeout_ms: 100,
            event_capacity: 1024,
            error_report_threshold: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_poll_timeout_is_100ms() {
        assert_eq!(ClientConfig::default().poll_timeout(), Duration::from_millis(100));
    }

    #[test]
    fn deserializes_from_json() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"poll_timeout_ms":25,"event_capacity":64,"error_report_threshold":1}"#,
        )
        .unwrap();
        assert_eq!(config.poll_timeout_ms, 25);
        assert_eq!(config.event_capacity, 64);
    }
}
