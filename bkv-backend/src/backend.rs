//! # Pull-Based Client Traits
//!
//! Purpose: Capture exactly the primitives the underlying client exposes:
//! request/response execution, batched execution with per-command outcomes,
//! optimistic-lock transaction execution, and a pull-style "next pub/sub
//! message" call on connections whose subscription set is fixed at open
//! time.

use std::time::Duration;

use async_trait::async_trait;

use bkv_common::{Command, CommandError, ConnectionError, Message, Value};

/// A watched key and the version token captured when the watch was placed.
///
/// Version 0 means "key absent"; any write bumps the key to a fresh
/// non-zero version, so create/delete cycles are always detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchToken {
    pub key: String,
    pub version: u64,
}

/// Raw outcome of a transactional batch at the backend boundary.
#[derive(Debug, PartialEq, Eq)]
pub enum TxReply {
    /// All commands ran atomically; one outcome per command, in order.
    Executed(Vec<Result<Value, CommandError>>),
    /// A watched key's version no longer matched; nothing ran.
    Aborted,
}

/// The underlying pull-based client.
///
/// Implementations are expected to be cheap to share (`Arc`) and to
/// serialize their own internal state; the mediation layer never assumes
/// more than the contracts below.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Establishes the publishing/command connection. Idempotent.
    async fn connect(&self) -> Result<(), ConnectionError>;

    /// Tears down all connections. Idempotent; pending subscriber polls
    /// observe `ConnectionError::Closed`.
    async fn disconnect(&self) -> Result<(), ConnectionError>;

    /// Executes a single command on the publishing connection.
    async fn execute(&self, command: &Command) -> Result<Result<Value, CommandError>, ConnectionError>;

    /// Executes a batch in submission order, isolating per-command
    /// failures: a failing command yields its own `Err` slot and the
    /// remaining commands still run.
    async fn execute_batch(
        &self,
        commands: &[Command],
    ) -> Result<Vec<Result<Value, CommandError>>, ConnectionError>;

    /// Atomically executes a batch, but only if every watched key still
    /// carries the version recorded in its token.
    async fn execute_transaction(
        &self,
        watches: &[WatchToken],
        commands: &[Command],
    ) -> Result<TxReply, ConnectionError>;

    /// Snapshot of a key's current version, for placing a watch.
    async fn key_version(&self, key: &str) -> Result<u64, ConnectionError>;

    /// Opens a subscriber connection bound to the given channels and
    /// patterns. The set is fixed for the connection's lifetime; changing
    /// the subscribed set means opening a replacement connection. The
    /// returned connection is ready to receive as soon as this resolves.
    async fn open_subscriber(
        &self,
        channels: &[String],
        patterns: &[String],
    ) -> Result<Box<dyn SubscriberConn>, ConnectionError>;
}

/// A live subscription connection with a fixed subscription set.
#[async_trait]
pub trait SubscriberConn: Send {
    /// Pulls the next pub/sub message, waiting at most `timeout`.
    ///
    /// `Ok(None)` is the timeout sentinel: nothing arrived, poll again.
    async fn next_message(&mut self, timeout: Duration) -> Result<Option<Message>, ConnectionError>;

    /// Releases the connection. Idempotent.
    async fn close(&mut self);
}
