//! # Queued Commands and Result Tuples
//!
//! Purpose: Model the unit of work a pipeline or transaction accumulates,
//! and the ordered `(error, value)` tuple each unit produces.
//!
//! ## Design Principles
//! 1. **Order-Preserving**: One `CommandResult` per queued command, in
//!    queue order, regardless of how many individual commands fail.
//! 2. **Binary-Safe Args**: Arguments are raw bytes so keys and payloads
//!    never pass through lossy string conversions.
//! 3. **Consume Once**: A queue is drained exactly once at execution time.

use bytes::Bytes;

use crate::error::CommandError;
use crate::value::Value;

/// A command captured by a queue but not yet executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Upper-cased command name, e.g. `SET`.
    pub name: String,
    /// Positional arguments, binary-safe.
    pub args: Vec<Bytes>,
}

impl Command {
    /// Creates a command with no arguments yet.
    pub fn new(name: impl Into<String>) -> Command {
        Command {
            name: name.into().to_ascii_uppercase(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Command {
        self.args.push(arg.into());
        self
    }

    /// Returns argument `idx` decoded as UTF-8, if present and valid.
    pub fn arg_str(&self, idx: usize) -> Option<&str> {
        self.args.get(idx).and_then(|a| std::str::from_utf8(a).ok())
    }
}

/// The per-command outcome slot of a batch: exactly one of `error` or a
/// meaningful `value` is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// The command-specific failure, `None` when the command succeeded.
    pub error: Option<CommandError>,
    /// The reply value; `Nil` whenever `error` is set.
    pub value: Value,
}

impl CommandResult {
    /// Wraps a successful reply.
    pub fn ok(value: Value) -> CommandResult {
        CommandResult { error: None, value }
    }

    /// Wraps a per-command failure; the value slot is nulled.
    pub fn err(error: CommandError) -> CommandResult {
        CommandResult {
            error: Some(error),
            value: Value::Nil,
        }
    }

    /// Repacks a raw backend outcome into the tuple shape.
    pub fn from_raw(raw: Result<Value, CommandError>) -> CommandResult {
        match raw {
            Ok(value) => CommandResult::ok(value),
            Err(error) => CommandResult::err(error),
        }
    }

    /// True when this slot holds a success.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Tagged outcome of a transaction execution.
///
/// Kept tagged internally so an aborted transaction can never be confused
/// with a successfully executed empty batch; the public API collapses
/// `Aborted` to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The batch ran; one tuple per queued command, order preserved.
    Executed(Vec<CommandResult>),
    /// A watched key changed; nothing was executed.
    Aborted,
}

impl ExecOutcome {
    /// Collapses the tag to the compatibility shape: `None` means aborted.
    pub fn into_results(self) -> Option<Vec<CommandResult>> {
        match self {
            ExecOutcome::Executed(results) => Some(results),
            ExecOutcome::Aborted => None,
        }
    }
}
