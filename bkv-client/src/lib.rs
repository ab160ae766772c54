//! # BridgeKV Client
//!
//! Purpose: Let code written against a push-style, event-driven KV client
//! API run on a backend whose subscription primitive is pull-based and
//! whose batched commands report outcomes differently.
//!
//! ## Design Principles
//! 1. **Two-Phase Swap**: Subscription connections have a fixed set; any
//!    change builds the replacement before retiring the predecessor.
//! 2. **Explicit Fan-Out**: One dispatcher matches every pulled message
//!    against the registry; no hidden emitter state.
//! 3. **Ordered Tuples**: Pipelines and transactions always return one
//!    `(error, value)` slot per queued command, in queue order.
//! 4. **Structural Abort**: A conflicted transaction resolves to `None`,
//!    never to an error and never to an empty array.

mod client;
mod config;
mod dispatch;
mod events;
mod lifecycle;
mod pipeline;
mod registry;
mod transaction;
mod worker;

pub use client::BridgeClient;
pub use config::ClientConfig;
pub use events::{EventBus, PushEvent};
pub use pipeline::Pipeline;
pub use registry::{ActiveSet, Subscription, SubscriptionRegistry};
pub use transaction::Transaction;

pub use bkv_common::{
    BridgeError, Command, CommandError, CommandResult, ConnectionError, ExecOutcome, Message,
    Value,
};
