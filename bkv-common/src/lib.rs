// bkv-common - Shared types for the BridgeKV compatibility layer
//
// This crate defines the values, commands, messages, and errors exchanged
// between the push-style client facade and pull-based backends.

pub mod command;
pub mod error;
pub mod glob;
pub mod message;
pub mod value;

// Re-export for convenience
pub use command::*;
pub use error::*;
pub use glob::*;
pub use message::*;
pub use value::*;
