//! # Bridge Client Facade
//!
//! Purpose: Expose the push-style API — subscribe/unsubscribe with
//! confirmation events, channel and pattern message events, pipelines, and
//! watch/multi transactions — on top of any pull-based [`Backend`].
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `BridgeClient` hides the registry, the connection
//!    lifecycle, and the poll workers behind the compatibility surface.
//! 2. **Registry First**: Subscription calls mutate the registry, emit
//!    their confirmation event, and only then reconcile connections, so
//!    counts are always consistent with the mutation order.
//! 3. **Deterministic Teardown**: `cleanup` retires every worker and
//!    connection and is safe to call any number of times.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::info;

use bkv_backend::Backend;
use bkv_common::{BridgeError, Command, ConnectionError, Value};

use crate::config::ClientConfig;
use crate::dispatch::EventDispatcher;
use crate::events::{EventBus, PushEvent};
use crate::lifecycle::LifecycleManager;
use crate::pipeline::Pipeline;
use crate::registry::{ActiveSet, Subscription, SubscriptionRegistry};
use crate::transaction::Transaction;

/// Push-style client over a pull-based backend.
pub struct BridgeClient {
    backend: Arc<dyn Backend>,
    registry: Arc<RwLock<SubscriptionRegistry>>,
    bus: EventBus,
    lifecycle: LifecycleManager,
}

impl BridgeClient {
    /// Creates a client with default configuration.
    pub fn new(backend: Arc<dyn Backend>) -> BridgeClient {
        BridgeClient::with_config(backend, ClientConfig::default())
    }

    /// Creates a client with a custom configuration.
    pub fn with_config(backend: Arc<dyn Backend>, config: ClientConfig) -> BridgeClient {
        let registry = Arc::new(RwLock::new(SubscriptionRegistry::new()));
        let bus = EventBus::with_capacity(config.event_capacity);
        let dispatcher = EventDispatcher::new(Arc::clone(&registry), bus.clone());
        let lifecycle = LifecycleManager::new(
            Arc::clone(&backend),
            Arc::clone(&registry),
            dispatcher,
            bus.clone(),
            config.poll_timeout(),
            config.error_report_threshold,
        );
        BridgeClient {
            backend,
            registry,
            bus,
            lifecycle,
        }
    }

    /// Establishes the publishing/command connection. Idempotent.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        self.backend.connect().await
    }

    /// Tears down workers, subscription connections, and the backend
    /// connection. Safe to call multiple times.
    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        self.cleanup().await;
        self.backend.disconnect().await
    }

    /// Alias for [`disconnect`](BridgeClient::disconnect), matching the
    /// push API's vocabulary.
    pub async fn quit(&self) -> Result<(), ConnectionError> {
        self.disconnect().await
    }

    /// Retires all workers and subscription connections and empties the
    /// registry, leaving the command connection up. Idempotent.
    pub async fn cleanup(&self) {
        self.lifecycle.shutdown().await;
        self.registry.write().clear();
        info!("bridge client cleaned up");
    }

    /// Opens a receiver for push events (confirmations, messages, pattern
    /// messages, background errors).
    pub fn events(&self) -> broadcast::Receiver<PushEvent> {
        self.bus.subscribe()
    }

    /// Subscribes to exact channels; returns the number of distinct exact
    /// subscriptions afterwards and emits one `Subscribed` event per
    /// channel. Duplicate subscriptions are ref-counted.
    pub async fn subscribe(&self, channels: &[&str]) -> usize {
        let mut count = self.registry.read().channel_count();
        for channel in channels {
            count = self
                .registry
                .write()
                .add(Subscription::Exact((*channel).to_string()));
            self.bus.emit(PushEvent::Subscribed {
                channel: (*channel).to_string(),
                count,
            });
        }
        self.lifecycle.reconcile().await;
        count
    }

    /// Drops one reference per listed channel; a channel stays subscribed
    /// until every reference is gone. Unknown channels are no-ops.
    pub async fn unsubscribe(&self, channels: &[&str]) -> usize {
        let mut count = self.registry.read().channel_count();
        for channel in channels {
            count = self
                .registry
                .write()
                .remove(&Subscription::Exact((*channel).to_string()));
            self.bus.emit(PushEvent::Unsubscribed {
                channel: (*channel).to_string(),
                count,
            });
        }
        self.lifecycle.reconcile().await;
        count
    }

    /// Subscribes to glob patterns; returns the number of distinct pattern
    /// subscriptions afterwards.
    pub async fn psubscribe(&self, patterns: &[&str]) -> usize {
        let mut count = self.registry.read().pattern_count();
        for pattern in patterns {
            count = self
                .registry
                .write()
                .add(Subscription::Pattern((*pattern).to_string()));
            self.bus.emit(PushEvent::PSubscribed {
                pattern: (*pattern).to_string(),
                count,
            });
        }
        self.lifecycle.reconcile().await;
        count
    }

    /// Drops one reference per listed pattern.
    pub async fn punsubscribe(&self, patterns: &[&str]) -> usize {
        let mut count = self.registry.read().pattern_count();
        for pattern in patterns {
            count = self
                .registry
                .write()
                .remove(&Subscription::Pattern((*pattern).to_string()));
            self.bus.emit(PushEvent::PUnsubscribed {
                pattern: (*pattern).to_string(),
                count,
            });
        }
        self.lifecycle.reconcile().await;
        count
    }

    /// Snapshot of the distinct active subscriptions.
    pub fn active_subscriptions(&self) -> ActiveSet {
        self.registry.read().active_set()
    }

    /// Publishes a payload; returns the number of subscriptions it reached.
    pub async fn publish(
        &self,
        channel: &str,
        payload: impl Into<Bytes>,
    ) -> Result<i64, BridgeError> {
        let payload: Bytes = payload.into();
        let command = Command::new("PUBLISH").arg(channel.to_string()).arg(payload);
        match self.backend.execute(&command).await?? {
            Value::Int(count) => Ok(count),
            other => Err(ConnectionError::Backend(format!(
                "unexpected publish reply: {other:?}"
            ))
            .into()),
        }
    }

    /// Liveness check on the command connection.
    pub async fn ping(&self) -> Result<Value, BridgeError> {
        Ok(self.backend.execute(&Command::new("PING")).await??)
    }

    /// Starts an empty pipeline bound to this client's backend.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(Arc::clone(&self.backend))
    }

    /// Starts a transaction coordinator; call `watch` before queuing.
    pub fn multi(&self) -> Transaction {
        Transaction::new(Arc::clone(&self.backend))
    }
}
