//! # Command Pipeline
//!
//! Purpose: Accumulate commands without executing them, then send the whole
//! queue as one batched call and reassemble an ordered array of per-command
//! `(error, value)` tuples.
//!
//! ## Design Principles
//! 1. **Fluent Accumulation**: Builder methods consume and return the
//!    pipeline so command lists compose without executing.
//! 2. **All or Nothing Sent**: Either the whole queue goes out in one
//!    batch, or (after `discard`) nothing is sent at all.
//! 3. **Single Use**: `exec` consumes the pipeline; a concurrent second
//!    execution cannot be expressed.

use std::sync::Arc;

use bytes::Bytes;

use bkv_backend::Backend;
use bkv_common::{Command, CommandResult, ConnectionError};

/// A queued, unconditionally-executed batch of commands.
pub struct Pipeline {
    backend: Arc<dyn Backend>,
    queue: Vec<Command>,
}

impl Pipeline {
    pub(crate) fn new(backend: Arc<dyn Backend>) -> Pipeline {
        Pipeline {
            backend,
            queue: Vec::new(),
        }
    }

    /// Appends an arbitrary command.
    pub fn cmd(mut self, command: Command) -> Pipeline {
        self.queue.push(command);
        self
    }

    /// Queues `SET key value`.
    pub fn set(self, key: &str, value: impl Into<Bytes>) -> Pipeline {
        let value: Bytes = value.into();
        self.cmd(Command::new("SET").arg(key.to_string()).arg(value))
    }

    /// Queues `GET key`.
    pub fn get(self, key: &str) -> Pipeline {
        self.cmd(Command::new("GET").arg(key.to_string()))
    }

    /// Queues `DEL key`.
    pub fn del(self, key: &str) -> Pipeline {
        self.cmd(Command::new("DEL").arg(key.to_string()))
    }

    /// Queues `INCR key`.
    pub fn incr(self, key: &str) -> Pipeline {
        self.cmd(Command::new("INCR").arg(key.to_string()))
    }

    /// Queues `EXISTS key`.
    pub fn exists(self, key: &str) -> Pipeline {
        self.cmd(Command::new("EXISTS").arg(key.to_string()))
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Clears the queue; a subsequent `exec` resolves to an empty array and
    /// nothing is sent to the backend.
    pub fn discard(mut self) -> Pipeline {
        self.queue.clear();
        self
    }

    /// Sends the queue as one batch and repacks the raw outcomes into
    /// ordered tuples. A failing command fills only its own slot; its
    /// siblings still execute and report their own outcomes.
    pub async fn exec(self) -> Result<Vec<CommandResult>, ConnectionError> {
        if self.queue.is_empty() {
            return Ok(Vec::new());
        }
        let raw = self.backend.execute_batch(&self.queue).await?;
        Ok(raw.into_iter().map(CommandResult::from_raw).collect())
    }
}
