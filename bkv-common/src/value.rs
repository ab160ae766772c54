//! # Reply Values
//!
//! Purpose: Represent command replies in a protocol-neutral shape so the
//! mediation layer can repack batch outcomes without caring about framing.
//!
//! ## Design Principles
//! 1. **Binary-Safe**: Bulk payloads are raw bytes, never assumed UTF-8.
//! 2. **Cheap Clones**: `Bytes` payloads make result tuples copy-light.
//! 3. **Explicit Null**: A missing value is `Nil`, never an empty bulk.

use bytes::Bytes;

/// A single reply value from the underlying client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Status-line replies such as `OK` or `PONG`.
    Simple(String),
    /// Integer replies (counters, counts, flags).
    Int(i64),
    /// Binary-safe bulk payloads.
    Bulk(Bytes),
    /// Nested replies (rare at this boundary).
    Array(Vec<Value>),
    /// Null reply: missing key, aborted slot, or explicit nil.
    Nil,
}

impl Value {
    /// Builds a bulk value from anything byte-like.
    pub fn bulk(data: impl Into<Bytes>) -> Value {
        Value::Bulk(data.into())
    }

    /// Builds the conventional `OK` status reply.
    pub fn ok() -> Value {
        Value::Simple("OK".to_string())
    }

    /// Returns the integer payload, if this is an integer reply.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the bulk payload decoded as UTF-8, if possible.
    ///
    /// Status replies also answer here so callers can treat `OK` and
    /// bulk `"OK"` uniformly.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Simple(text) => Some(text),
            Value::Bulk(data) => std::str::from_utf8(data).ok(),
            _ => None,
        }
    }

    /// True when the reply is the null sentinel.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Value {
        Value::Bulk(Bytes::copy_from_slice(text.as_bytes()))
    }
}
