//! # Error Taxonomy
//!
//! Purpose: Separate connection-level failures (which propagate to the
//! caller or the error event stream) from per-command failures (which are
//! always captured into that command's result tuple).
//!
//! ## Design Principles
//! 1. **Failure Isolation**: A `CommandError` never aborts sibling commands
//!    in the same batch; it travels inside the result tuple.
//! 2. **Structural Abort**: Transaction aborts are signaled by the outcome
//!    type, never by an error value.
//! 3. **Fail Fast**: Connection problems surface immediately where no
//!    per-item slot exists to hold them.

use thiserror::Error;

/// Connection-level failures: no per-command slot exists for these.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Network or IO failure while talking to the backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Operation attempted before `connect()` or after `disconnect()`.
    #[error("not connected")]
    NotConnected,
    /// The connection was retired or the backend shut down underneath us.
    #[error("connection closed")]
    Closed,
    /// Backend-specific failure that is not tied to a single command.
    #[error("backend error: {0}")]
    Backend(String),
}

/// A single command's failure inside a batch or a direct call.
///
/// Messages follow the upstream server's error vocabulary so callers that
/// string-match error prefixes keep working.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR {0}")]
    Other(String),
}

/// Top-level error for single (non-batched) operations, where either kind
/// of failure rejects the whole call.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Command(#[from] CommandError),
}
