//! # In-Memory Reference Backend
//!
//! Provide an in-process implementation of the pull-based client boundary
//! so the mediation layer can be exercised end to end without a network.
//!
//! ## Design Principles
//!
//! 1. **Single Write Lock**: Batches and transactions run under one write
//!    lock, so they are atomic from the perspective of other callers.
//! 2. **Versioned Entries**: Every write bumps a monotonic per-key version;
//!    version 0 means "absent", which makes create/delete cycles visible to
//!    watches.
//! 3. **Fixed-Set Subscribers**: A subscriber connection carries the
//!    channels and patterns it was opened with and delivers one copy of
//!    each matching publish through its own queue, preserving per-channel
//!    publish order.
//! 4. **Strategy Pattern**: Implements `Backend` so tests and demos plug in
//!    where a real network client would.

use std::sync::Arc;
use std::time::Duration;

use ahash::RandomState;
use async_trait::async_trait;
use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use bkv_common::{glob_match, Command, CommandError, ConnectionError, Message, Value};

use crate::backend::{Backend, SubscriberConn, TxReply, WatchToken};

/// A stored value with its watch token.
struct Entry {
    value: Bytes,
    version: u64,
}

/// One open subscriber connection, as seen from the publish side.
struct SubscriberSlot {
    id: u64,
    channels: Vec<String>,
    patterns: Vec<String>,
    tx: mpsc::UnboundedSender<Message>,
}

struct Shared {
    connected: bool,
    next_version: u64,
    next_subscriber_id: u64,
    map: HashMap<String, Entry, RandomState>,
    subscribers: Vec<SubscriberSlot>,
}

impl Shared {
    fn bump_version(&mut self) -> u64 {
        let version = self.next_version;
        self.next_version += 1;
        version
    }

    fn version_of(&self, key: &str) -> u64 {
        self.map.get(key).map(|entry| entry.version).unwrap_or(0)
    }
}

/// In-memory backend with versioned keys and fixed-set subscriber
/// connections.
pub struct MemoryBackend {
    shared: Arc<RwLock<Shared>>,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend {
            shared: Arc::new(RwLock::new(Shared {
                connected: false,
                next_version: 1,
                next_subscriber_id: 1,
                map: HashMap::with_hasher(RandomState::new()),
                subscribers: Vec::new(),
            })),
        }
    }

    /// Reads a key directly, bypassing the command path. Test hook for
    /// verifying that discarded or aborted batches had no effect.
    pub fn peek(&self, key: &str) -> Option<Bytes> {
        self.shared.read().map.get(key).map(|entry| entry.value.clone())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        MemoryBackend::new()
    }
}

fn key_arg(command: &Command, idx: usize) -> Result<String, CommandError> {
    command
        .arg_str(idx)
        .map(str::to_string)
        .ok_or_else(|| CommandError::Other("invalid argument".to_string()))
}

/// Applies one command against the locked state.
///
/// Every failure here is a `CommandError`: it fills the command's own
/// outcome slot and never disturbs the rest of a batch.
fn apply_command(shared: &mut Shared, command: &Command) -> Result<Value, CommandError> {
    match command.name.as_str() {
        "PING" => match command.args.len() {
            0 => Ok(Value::Simple("PONG".to_string())),
            1 => Ok(Value::Bulk(command.args[0].clone())),
            _ => Err(CommandError::WrongArity("ping".to_string())),
        },
        "GET" => {
            if command.args.len() != 1 {
                return Err(CommandError::WrongArity("get".to_string()));
            }
            let key = key_arg(command, 0)?;
            match shared.map.get(&key) {
                Some(entry) => Ok(Value::Bulk(entry.value.clone())),
                None => Ok(Value::Nil),
            }
        }
        "SET" => {
            if command.args.len() != 2 {
                return Err(CommandError::WrongArity("set".to_string()));
            }
            let key = key_arg(command, 0)?;
            let version = shared.bump_version();
            shared.map.insert(
                key,
                Entry {
                    value: command.args[1].clone(),
                    version,
                },
            );
            Ok(Value::ok())
        }
        "DEL" => {
            if command.args.is_empty() {
                return Err(CommandError::WrongArity("del".to_string()));
            }
            let mut removed = 0;
            for idx in 0..command.args.len() {
                let key = key_arg(command, idx)?;
                if shared.map.remove(&key).is_some() {
                    removed += 1;
                }
            }
            Ok(Value::Int(removed))
        }
        "EXISTS" => {
            if command.args.is_empty() {
                return Err(CommandError::WrongArity("exists".to_string()));
            }
            let mut found = 0;
            for idx in 0..command.args.len() {
                let key = key_arg(command, idx)?;
                if shared.map.contains_key(&key) {
                    found += 1;
                }
            }
            Ok(Value::Int(found))
        }
        "INCR" => {
            if command.args.len() != 1 {
                return Err(CommandError::WrongArity("incr".to_string()));
            }
            let key = key_arg(command, 0)?;
            let current = match shared.map.get(&key) {
                Some(entry) => std::str::from_utf8(&entry.value)
                    .ok()
                    .and_then(|text| text.parse::<i64>().ok())
                    .ok_or(CommandError::NotAnInteger)?,
                None => 0,
            };
            let next = current
                .checked_add(1)
                .ok_or(CommandError::NotAnInteger)?;
            let version = shared.bump_version();
            shared.map.insert(
                key,
                Entry {
                    value: Bytes::from(next.to_string()),
                    version,
                },
            );
            Ok(Value::Int(next))
        }
        "PUBLISH" => {
            if command.args.len() != 2 {
                return Err(CommandError::WrongArity("publish".to_string()));
            }
            let channel = key_arg(command, 0)?;
            let payload = command.args[1].clone();
            Ok(Value::Int(publish(shared, &channel, payload)))
        }
        other => Err(CommandError::UnknownCommand(other.to_lowercase())),
    }
}

/// Delivers one unattributed copy per matching subscriber connection and
/// returns the number of matched subscriptions, counting each matching
/// pattern separately the way the upstream server does.
fn publish(shared: &mut Shared, channel: &str, payload: Bytes) -> i64 {
    let mut receivers = 0i64;
    for slot in &shared.subscribers {
        let exact_hits = slot.channels.iter().filter(|c| c.as_str() == channel).count();
        let pattern_hits = slot
            .patterns
            .iter()
            .filter(|p| glob_match(p, channel))
            .count();
        let hits = exact_hits + pattern_hits;
        if hits == 0 {
            continue;
        }
        if slot.tx.send(Message::new(channel, payload.clone())).is_ok() {
            receivers += hits as i64;
        }
    }
    receivers
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn connect(&self) -> Result<(), ConnectionError> {
        self.shared.write().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectionError> {
        let mut shared = self.shared.write();
        shared.connected = false;
        // Dropping the senders wakes every pending subscriber poll.
        shared.subscribers.clear();
        Ok(())
    }

    async fn execute(
        &self,
        command: &Command,
    ) -> Result<Result<Value, CommandError>, ConnectionError> {
        let mut shared = self.shared.write();
        if !shared.connected {
            return Err(ConnectionError::NotConnected);
        }
        Ok(apply_command(&mut shared, command))
    }

    async fn execute_batch(
        &self,
        commands: &[Command],
    ) -> Result<Vec<Result<Value, CommandError>>, ConnectionError> {
        let mut shared = self.shared.write();
        if !shared.connected {
            return Err(ConnectionError::NotConnected);
        }
        let mut outcomes = Vec::with_capacity(commands.len());
        for command in commands {
            outcomes.push(apply_command(&mut shared, command));
        }
        Ok(outcomes)
    }

    async fn execute_transaction(
        &self,
        watches: &[WatchToken],
        commands: &[Command],
    ) -> Result<TxReply, ConnectionError> {
        let mut shared = self.shared.write();
        if !shared.connected {
            return Err(ConnectionError::NotConnected);
        }
        for token in watches {
            if shared.version_of(&token.key) != token.version {
                debug!(key = %token.key, "watched key changed, aborting transaction");
                return Ok(TxReply::Aborted);
            }
        }
        let mut outcomes = Vec::with_capacity(commands.len());
        for command in commands {
            outcomes.push(apply_command(&mut shared, command));
        }
        Ok(TxReply::Executed(outcomes))
    }

    async fn key_version(&self, key: &str) -> Result<u64, ConnectionError> {
        let shared = self.shared.read();
        if !shared.connected {
            return Err(ConnectionError::NotConnected);
        }
        Ok(shared.version_of(key))
    }

    async fn open_subscriber(
        &self,
        channels: &[String],
        patterns: &[String],
    ) -> Result<Box<dyn SubscriberConn>, ConnectionError> {
        let mut shared = self.shared.write();
        if !shared.connected {
            return Err(ConnectionError::NotConnected);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let id = shared.next_subscriber_id;
        shared.next_subscriber_id += 1;
        shared.subscribers.push(SubscriberSlot {
            id,
            channels: channels.to_vec(),
            patterns: patterns.to_vec(),
            tx,
        });
        debug!(id, channels = channels.len(), patterns = patterns.len(), "subscriber opened");
        Ok(Box::new(MemorySubscriber {
            id,
            rx,
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Receiving half of a subscriber connection.
struct MemorySubscriber {
    id: u64,
    rx: mpsc::UnboundedReceiver<Message>,
    shared: Arc<RwLock<Shared>>,
}

impl MemorySubscriber {
    fn unregister(&self) {
        self.shared.write().subscribers.retain(|slot| slot.id != self.id);
    }
}

#[async_trait]
impl SubscriberConn for MemorySubscriber {
    async fn next_message(&mut self, timeout: Duration) -> Result<Option<Message>, ConnectionError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(ConnectionError::Closed),
            Err(_) => Ok(None),
        }
    }

    async fn close(&mut self) {
        self.unregister();
        self.rx.close();
    }
}

impl Drop for MemorySubscriber {
    fn drop(&mut self) {
        self.unregister();
    }
}
