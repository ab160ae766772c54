//! # BridgeKV Backend Boundary
//!
//! Purpose: Define the pull-based client primitives the mediation layer is
//! built on, and provide an in-process reference backend for tests and
//! demos.
//!
//! ## Design Principles
//! 1. **Strategy Pattern**: `Backend` keeps the mediation core decoupled
//!    from any concrete network client.
//! 2. **Fixed Subscription Sets**: A subscriber connection's channels and
//!    patterns are decided when it is opened and never change afterwards.
//! 3. **Per-Command Outcomes**: Batched execution reports one outcome per
//!    command; a failing command never aborts its siblings.

mod backend;
mod memory;

pub use backend::{Backend, SubscriberConn, TxReply, WatchToken};
pub use memory::MemoryBackend;
