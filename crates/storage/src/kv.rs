//! Key-value store for credentials and small settings
//!
//! This module provides the sled-backed [`SecureStore`]. Values are stored
//! JSON-encoded and every write is flushed before it returns.

use sled::{Batch, Db};
use std::sync::Arc;
use thiserror::Error;

use crate::SecureStore;

/// Key-value store error types
#[derive(Debug, Error)]
pub enum KvError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The backing store refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Key-value store configuration
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Database path
    pub path: String,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Enable compression
    pub use_compression: bool,
    /// Flush interval in milliseconds (None for immediate flush)
    pub flush_every_ms: Option<u64>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            path: "gem_market_kv.db".to_string(),
            cache_capacity: 4 * 1024 * 1024, // 4MB
            use_compression: true,
            flush_every_ms: Some(500),
        }
    }
}

impl KvConfig {
    /// Create a new configuration with a custom path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression
    pub fn use_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }
}

/// Key-value store implementation
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Db>,
}

impl KvStore {
    /// Create a new key-value store with configuration
    pub fn new(config: KvConfig) -> Result<Self> {
        let mut db_config = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression);

        if let Some(ms) = config.flush_every_ms {
            db_config = db_config.flush_every_ms(Some(ms));
        }

        let db = db_config.open()?;
        tracing::debug!(path = %config.path, "opened key-value store");

        Ok(Self { db: Arc::new(db) })
    }

    /// Create an in-memory key-value store (for testing)
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl SecureStore for KvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut batch = Batch::default();
        for (key, value) in entries {
            validate_key(key)?;
            batch.insert(key.as_bytes(), serde_json::to_vec(value)?);
        }
        self.db.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<usize> {
        let mut existing = 0;
        let mut batch = Batch::default();
        for key in keys {
            if self.db.contains_key(key.as_bytes())? {
                existing += 1;
            }
            batch.remove(key.as_bytes());
        }
        self.db.apply_batch(batch)?;
        self.db.flush()?;
        Ok(existing)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}
