//! # Connection Lifecycle Manager
//!
//! Purpose: Own the subscription connections. The underlying client fixes a
//! connection's subscription set at open time, so every change to the
//! subscribed set means provisioning a replacement connection.
//!
//! ## Design Principles
//! 1. **Build New Before Retiring Old**: The replacement connection is
//!    opened and its worker attached before the previous connection is torn
//!    down; messages for unaffected channels are never dropped in the
//!    window.
//! 2. **Serialized Reconcile**: A single async mutex guards the current
//!    connection slot, so overlapping subscribe/unsubscribe calls cannot
//!    race to build two replacements.
//! 3. **Keep What Works**: If provisioning the replacement fails, the old
//!    connection stays live and the failure is reported on the event bus.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use bkv_backend::Backend;

use crate::dispatch::EventDispatcher;
use crate::events::{EventBus, PushEvent};
use crate::registry::{ActiveSet, SubscriptionRegistry};
use crate::worker::WorkerHandle;

/// The current subscription connection and the set it was opened with.
struct Slot {
    live_set: ActiveSet,
    current: Option<WorkerHandle>,
}

pub(crate) struct LifecycleManager {
    backend: Arc<dyn Backend>,
    registry: Arc<RwLock<SubscriptionRegistry>>,
    dispatcher: EventDispatcher,
    bus: EventBus,
    poll_timeout: Duration,
    error_report_threshold: u32,
    slot: Mutex<Slot>,
}

impl LifecycleManager {
    pub(crate) fn new(
        backend: Arc<dyn Backend>,
        registry: Arc<RwLock<SubscriptionRegistry>>,
        dispatcher: EventDispatcher,
        bus: EventBus,
        poll_timeout: Duration,
        error_report_threshold: u32,
    ) -> LifecycleManager {
        LifecycleManager {
            backend,
            registry,
            dispatcher,
            bus,
            poll_timeout,
            error_report_threshold,
            slot: Mutex::new(Slot {
                live_set: ActiveSet::default(),
                current: None,
            }),
        }
    }

    /// Brings the live subscription connection in line with the registry.
    ///
    /// No-op when the connected set already matches. Otherwise performs the
    /// two-phase swap: open replacement, attach its worker, swap it in,
    /// only then retire the predecessor.
    ///
    /// Between the replacement opening and the predecessor's retirement
    /// both connections are live, so a publish to a channel present in
    /// both sets can be delivered twice inside that window; retiring first
    /// would instead open a message-loss window for unaffected channels.
    pub(crate) async fn reconcile(&self) {
        let mut slot = self.slot.lock().await;
        let desired = self.registry.read().active_set();
        if desired == slot.live_set {
            return;
        }

        if desired.is_empty() {
            if let Some(old) = slot.current.take() {
                old.retire().await;
            }
            slot.live_set = ActiveSet::default();
            debug!("last subscription removed, connection retired");
            return;
        }

        match self
            .backend
            .open_subscriber(&desired.channels, &desired.patterns)
            .await
        {
            Ok(conn) => {
                let worker = WorkerHandle::spawn(
                    conn,
                    self.dispatcher.clone(),
                    self.bus.clone(),
                    self.poll_timeout,
                    self.error_report_threshold,
                );
                let old = slot.current.replace(worker);
                debug!(
                    channels = desired.channels.len(),
                    patterns = desired.patterns.len(),
                    "subscription connection swapped"
                );
                slot.live_set = desired;
                if let Some(old) = old {
                    old.retire().await;
                }
            }
            Err(err) => {
                // The previous connection stays live; unaffected channels
                // keep flowing and a later mutation retries the rebuild.
                warn!(error = %err, "failed to provision subscription connection");
                self.bus.emit(PushEvent::Error {
                    message: format!("subscription connection rebuild failed: {err}"),
                });
            }
        }
    }

    /// Retires the current connection and worker unconditionally.
    /// Idempotent.
    pub(crate) async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(old) = slot.current.take() {
            old.retire().await;
            info!("subscription connection shut down");
        }
        slot.live_set = ActiveSet::default();
    }
}
