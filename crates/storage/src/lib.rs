//! Storage layer for Gem Market
//!
//! This crate provides the durable key-value area the session core persists
//! credentials into, plus an in-memory backend for tests and ephemeral
//! sessions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;
pub mod memory;

pub use kv::{KvConfig, KvError, KvStore};
pub use memory::MemoryStore;

/// A durable string key-value area
///
/// Implementations must be shareable across tasks. Values are opaque strings;
/// callers that need structure serialize to JSON themselves.
pub trait SecureStore: Send + Sync {
    /// Read a single value
    fn get(&self, key: &str) -> kv::Result<Option<String>>;

    /// Write several entries as one unit
    ///
    /// Backends apply the entries atomically where they can; on error the
    /// caller must assume none of them were written.
    fn set_many(&self, entries: &[(&str, &str)]) -> kv::Result<()>;

    /// Remove several keys, returning how many existed
    fn remove_many(&self, keys: &[&str]) -> kv::Result<usize>;
}
