//! # Transaction Coordinator
//!
//! Purpose: Extend the pipeline with a watched-key set: the queued batch
//! executes atomically only if no watched key changed since `watch`;
//! otherwise nothing executes and the abort is signaled structurally.
//!
//! ## Design Principles
//! 1. **Tagged Outcome**: `ExecOutcome::{Executed, Aborted}` internally, so
//!    an aborted transaction can never be mistaken for an executed empty
//!    batch; the public `exec` collapses `Aborted` to `None`.
//! 2. **Watch Before Queue**: Placing a watch after commands were queued is
//!    refused, mirroring the upstream `WATCH inside MULTI` rule.
//! 3. **Single Use**: `exec` consumes the coordinator.

use std::sync::Arc;

use bytes::Bytes;

use bkv_backend::{Backend, TxReply, WatchToken};
use bkv_common::{BridgeError, Command, CommandError, CommandResult, ConnectionError, ExecOutcome};

/// Coordinator state: watching happens strictly before queuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Unwatched,
    Watching,
    Queuing,
}

/// A queued batch guarded by watched keys, executed atomically or aborted
/// entirely.
pub struct Transaction {
    backend: Arc<dyn Backend>,
    watches: Vec<WatchToken>,
    queue: Vec<Command>,
    state: TxState,
}

impl Transaction {
    pub(crate) fn new(backend: Arc<dyn Backend>) -> Transaction {
        Transaction {
            backend,
            watches: Vec::new(),
            queue: Vec::new(),
            state: TxState::Unwatched,
        }
    }

    /// Captures the current version of each key. At `exec` time the batch
    /// only runs if every watched key still carries its captured version.
    ///
    /// Watching the same key twice keeps the earlier token: the guard is
    /// against changes since the FIRST watch.
    pub async fn watch(&mut self, keys: &[&str]) -> Result<(), BridgeError> {
        if self.state == TxState::Queuing {
            return Err(CommandError::Other("WATCH inside MULTI is not allowed".to_string()).into());
        }
        for key in keys {
            if self.watches.iter().any(|token| token.key == *key) {
                continue;
            }
            let version = self.backend.key_version(key).await?;
            self.watches.push(WatchToken {
                key: (*key).to_string(),
                version,
            });
        }
        if !self.watches.is_empty() {
            self.state = TxState::Watching;
        }
        Ok(())
    }

    /// Drops every watch; the next `exec` runs unconditionally.
    pub fn unwatch(&mut self) {
        self.watches.clear();
        if self.state == TxState::Watching {
            self.state = TxState::Unwatched;
        }
    }

    /// Appends an arbitrary command to the queue.
    pub fn cmd(mut self, command: Command) -> Transaction {
        self.queue.push(command);
        self.state = TxState::Queuing;
        self
    }

    /// Queues `SET key value`.
    pub fn set(self, key: &str, value: impl Into<Bytes>) -> Transaction {
        let value: Bytes = value.into();
        self.cmd(Command::new("SET").arg(key.to_string()).arg(value))
    }

    /// Queues `GET key`.
    pub fn get(self, key: &str) -> Transaction {
        self.cmd(Command::new("GET").arg(key.to_string()))
    }

    /// Queues `DEL key`.
    pub fn del(self, key: &str) -> Transaction {
        self.cmd(Command::new("DEL").arg(key.to_string()))
    }

    /// Queues `INCR key`.
    pub fn incr(self, key: &str) -> Transaction {
        self.cmd(Command::new("INCR").arg(key.to_string()))
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Clears the queue and the watch set; a subsequent `exec` resolves to
    /// an empty array and nothing is sent.
    pub fn discard(mut self) -> Transaction {
        self.queue.clear();
        self.watches.clear();
        self.state = TxState::Unwatched;
        self
    }

    /// Executes the queued batch atomically, or aborts if any watched key
    /// changed. `None` is the abort sentinel; callers must branch on it,
    /// not on result length.
    pub async fn exec(self) -> Result<Option<Vec<CommandResult>>, ConnectionError> {
        Ok(self.exec_tagged().await?.into_results())
    }

    /// Tagged execution, kept separate so callers inside the crate never
    /// lose the abort/empty distinction.
    pub(crate) async fn exec_tagged(self) -> Result<ExecOutcome, ConnectionError> {
        if self.queue.is_empty() && self.watches.is_empty() {
            return Ok(ExecOutcome::Executed(Vec::new()));
        }
        match self
            .backend
            .execute_transaction(&self.watches, &self.queue)
            .await?
        {
            TxReply::Executed(raw) => Ok(ExecOutcome::Executed(
                raw.into_iter().map(CommandResult::from_raw).collect(),
            )),
            TxReply::Aborted => Ok(ExecOutcome::Aborted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bkv_backend::MemoryBackend;
    use bkv_common::Value;

    async fn backend() -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new());
        backend.connect().await.unwrap();
        backend
    }

    #[tokio::test]
    async fn unconflicted_exec_returns_pipeline_shaped_tuples() {
        let backend = backend().await;
        let results = Transaction::new(Arc::clone(&backend) as Arc<dyn Backend>)
            .set("counter", "0")
            .incr("counter")
            .incr("counter")
            .get("counter")
            .exec()
            .await
            .unwrap()
            .expect("not aborted");
        assert_eq!(results[0], CommandResult::ok(Value::ok()));
        assert_eq!(results[1], CommandResult::ok(Value::Int(1)));
        assert_eq!(results[2], CommandResult::ok(Value::Int(2)));
        assert_eq!(results[3], CommandResult::ok(Value::bulk("2")));
    }

    #[tokio::test]
    async fn conflicting_write_aborts_with_none() {
        let backend = backend().await;
        let mut tx = Transaction::new(Arc::clone(&backend) as Arc<dyn Backend>);
        tx.watch(&["k"]).await.unwrap();

        // Another caller writes the watched key before exec.
        other_conn(&backend).set("k", "changed").exec().await.unwrap();

        let outcome = tx.set("k", "mine").exec().await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(backend.peek("k"), Some(bytes::Bytes::from("changed")));
    }

    /// Acts as "a different connection" writing behind the transaction's back.
    fn other_conn(backend: &Arc<MemoryBackend>) -> crate::pipeline::Pipeline {
        crate::pipeline::Pipeline::new(Arc::clone(backend) as Arc<dyn Backend>)
    }

    #[tokio::test]
    async fn watch_after_queue_is_refused() {
        let backend = backend().await;
        let mut tx = Transaction::new(Arc::clone(&backend) as Arc<dyn Backend>).set("a", "1");
        let result = tx.watch(&["a"]).await;
        assert!(matches!(
            result,
            Err(BridgeError::Command(CommandError::Other(_)))
        ));
    }

    #[tokio::test]
    async fn unwatch_disarms_the_guard() {
        let backend = backend().await;
        let mut tx = Transaction::new(Arc::clone(&backend) as Arc<dyn Backend>);
        tx.watch(&["k"]).await.unwrap();
        other_conn(&backend).set("k", "changed").exec().await.unwrap();
        tx.unwatch();

        let outcome = tx.set("k", "mine").exec().await.unwrap();
        assert!(outcome.is_some());
        assert_eq!(backend.peek("k"), Some(bytes::Bytes::from("mine")));
    }

    #[tokio::test]
    async fn watch_with_no_keys_leaves_state_untouched() {
        let backend = backend().await;
        let mut tx = Transaction::new(Arc::clone(&backend) as Arc<dyn Backend>);
        tx.watch(&[]).await.unwrap();
        assert!(tx.watches.is_empty());
        assert_eq!(tx.state, TxState::Unwatched);
    }

    #[tokio::test]
    async fn empty_transaction_resolves_to_empty_array() {
        let backend = backend().await;
        let outcome = Transaction::new(Arc::clone(&backend) as Arc<dyn Backend>)
            .exec()
            .await
            .unwrap();
        assert_eq!(outcome, Some(Vec::new()));
    }

    #[tokio::test]
    async fn discard_clears_queue_and_watches() {
        let backend = backend().await;
        let mut tx = Transaction::new(Arc::clone(&backend) as Arc<dyn Backend>);
        tx.watch(&["k"]).await.unwrap();
        let tx = tx.set("k", "1").discard();
        assert!(tx.is_empty());
        let outcome = tx.exec().await.unwrap();
        assert_eq!(outcome, Some(Vec::new()));
        assert_eq!(backend.peek("k"), None);
    }
}
