//! In-memory key-value backend
//!
//! Nothing survives the process. Used for tests and for sessions the user
//! chose not to remember on this device.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::kv::Result;
use crate::SecureStore;

/// Process-local [`SecureStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SecureStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut map = self.entries.write();
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<usize> {
        let mut map = self.entries.write();
        Ok(keys.iter().filter(|key| map.remove(**key).is_some()).count())
    }
}
