//! Persisted key-value records
//!
//! The engine keeps exactly one durable fact (the date of the last Daily
//! round), stored through [`KeyValueStore`] so tests can swap in memory.

mod file;

pub use file::FileStore;

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// Errors reading or writing persisted records
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("failed to replace record file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("record store lock poisoned")]
    Poisoned,
}

/// Minimal string key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("lastDailyPlayed").unwrap(), None);

        store.set("lastDailyPlayed", "2026-10-19").unwrap();
        assert_eq!(
            store.get("lastDailyPlayed").unwrap().as_deref(),
            Some("2026-10-19")
        );

        store.set("lastDailyPlayed", "2026-10-20").unwrap();
        assert_eq!(
            store.get("lastDailyPlayed").unwrap().as_deref(),
            Some("2026-10-20")
        );
    }
}
