//! # Poll Worker
//!
//! Purpose: Drive one subscriber connection with a bounded pull loop and
//! hand every message to the dispatcher before polling again.
//!
//! ## Design Principles
//! 1. **Explicit State Machine**: Idle -> Polling -> (Dispatching ->
//!    Polling)* -> Stopped; transitions are traced, never implicit.
//! 2. **Cooperative Cancellation**: An atomic active flag is re-checked
//!    between polls, so shutdown latency is bounded by the poll timeout.
//! 3. **Natural Backpressure**: The next poll is not issued until dispatch
//!    returns; effective queue depth is one.
//! 4. **Never Die Quietly**: Transient poll failures are logged and
//!    retried; a persistent failure streak surfaces as an `Error` event,
//!    but the worker keeps polling until it is retired.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use bkv_backend::SubscriberConn;

use crate::dispatch::EventDispatcher;
use crate::events::{EventBus, PushEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Idle,
    Polling,
    Dispatching,
    Stopped,
}

/// Handle to a spawned poll worker; owns its retirement.
pub(crate) struct WorkerHandle {
    active: Arc<AtomicBool>,
    join: JoinHandle<Box<dyn SubscriberConn>>,
}

impl WorkerHandle {
    /// Spawns a worker bound 1:1 to `conn`.
    pub(crate) fn spawn(
        conn: Box<dyn SubscriberConn>,
        dispatcher: EventDispatcher,
        bus: EventBus,
        poll_timeout: Duration,
        error_report_threshold: u32,
    ) -> WorkerHandle {
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);
        let join = tokio::spawn(async move {
            run(conn, flag, dispatcher, bus, poll_timeout, error_report_threshold).await
        });
        WorkerHandle { active, join }
    }

    /// Clears the active flag, waits for the loop to exit, then closes the
    /// connection. The wait is bounded by the poll timeout.
    pub(crate) async fn retire(self) {
        self.active.store(false, Ordering::Release);
        match self.join.await {
            Ok(mut conn) => conn.close().await,
            Err(err) => warn!(error = %err, "poll worker task failed during retirement"),
        }
    }
}

/// The worker loop. Returns the connection so the retiring caller can close
/// it after the last poll has resolved.
async fn run(
    mut conn: Box<dyn SubscriberConn>,
    active: Arc<AtomicBool>,
    dispatcher: EventDispatcher,
    bus: EventBus,
    poll_timeout: Duration,
    error_report_threshold: u32,
) -> Box<dyn SubscriberConn> {
    let mut state = WorkerState::Idle;
    trace!(?state, "poll worker starting");
    let mut failure_streak: u32 = 0;

    while active.load(Ordering::Acquire) {
        state = WorkerState::Polling;
        trace!(?state, "awaiting next message");
        match conn.next_message(poll_timeout).await {
            Ok(Some(message)) => {
                state = WorkerState::Dispatching;
                let emitted = dispatcher.dispatch(&message);
                trace!(?state, channel = %message.channel, emitted, "dispatched message");
                failure_streak = 0;
            }
            Ok(None) => {
                // Timeout sentinel: nothing arrived, loop and re-check the flag.
                failure_streak = 0;
            }
            Err(err) => {
                failure_streak += 1;
                warn!(error = %err, failure_streak, "subscription poll failed");
                if failure_streak == error_report_threshold {
                    bus.emit(PushEvent::Error {
                        message: format!("subscription polling is failing: {err}"),
                    });
                }
                // Back off so a hard failure does not become a hot loop.
                tokio::time::sleep(poll_timeout).await;
            }
        }
    }

    state = WorkerState::Stopped;
    debug!(?state, "poll worker retired");
    conn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Subscription, SubscriptionRegistry};
    use async_trait::async_trait;
    use bkv_common::{ConnectionError, Message};
    use bytes::Bytes;
    use parking_lot::RwLock;

    /// Scripted connection: yields each item once, then times out forever.
    struct ScriptedConn {
        script: Vec<Result<Option<Message>, ()>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SubscriberConn for ScriptedConn {
        async fn next_message(
            &mut self,
            timeout: Duration,
        ) -> Result<Option<Message>, ConnectionError> {
            match self.script.pop() {
                Some(Ok(message)) => Ok(message),
                Some(Err(())) => Err(ConnectionError::Closed),
                None => {
                    tokio::time::sleep(timeout).await;
                    Ok(None)
                }
            }
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::Release);
        }
    }

    fn wiring(subs: Vec<Subscription>) -> (EventDispatcher, EventBus) {
        let registry = Arc::new(RwLock::new(SubscriptionRegistry::new()));
        {
            let mut guard = registry.write();
            for sub in subs {
                guard.add(sub);
            }
        }
        let bus = EventBus::with_capacity(16);
        (EventDispatcher::new(registry, bus.clone()), bus)
    }

    #[tokio::test]
    async fn worker_dispatches_then_stops_on_retire() {
        let (dispatcher, bus) = wiring(vec![Subscription::Exact("c".into())]);
        let mut rx = bus.subscribe();
        let closed = Arc::new(AtomicBool::new(false));
        let conn = Box::new(ScriptedConn {
            script: vec![Ok(Some(Message::new("c", Bytes::from("payload"))))],
            closed: Arc::clone(&closed),
        });

        let handle = WorkerHandle::spawn(
            conn,
            dispatcher,
            bus,
            Duration::from_millis(10),
            3,
        );

        match rx.recv().await.unwrap() {
            PushEvent::Message { channel, .. } => assert_eq!(channel, "c"),
            other => panic!("unexpected event: {other:?}"),
        }

        handle.retire().await;
        assert!(closed.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn persistent_poll_failures_surface_as_error_event() {
        let (dispatcher, bus) = wiring(vec![]);
        let mut rx = bus.subscribe();
        let closed = Arc::new(AtomicBool::new(false));
        let conn = Box::new(ScriptedConn {
            script: vec![Err(()), Err(())],
            closed: Arc::clone(&closed),
        });

        let handle = WorkerHandle::spawn(
            conn,
            dispatcher,
            bus,
            Duration::from_millis(5),
            2,
        );

        match rx.recv().await.unwrap() {
            PushEvent::Error { message } => assert!(message.contains("polling is failing")),
            other => panic!("unexpected event: {other:?}"),
        }

        // The worker keeps running after reporting; retirement still works.
        handle.retire().await;
        assert!(closed.load(Ordering::Acquire));
    }
}
