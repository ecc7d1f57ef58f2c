//! In-process store, mostly useful for tests and ephemeral queues.

use super::{Entries, Store, StoreError, StoreFactory};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
struct Entry {
    content: Option<Vec<u8>>,
    modified: DateTime<Utc>,
}

/// Ordered in-memory store for one state.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    state: String,
    entries: BTreeMap<String, Entry>,
    strict: bool,
}

impl MemoryStore {
    /// Strict store: `put` on an existing key fails.
    pub fn new(state: &str) -> Self {
        Self {
            state: state.to_string(),
            entries: BTreeMap::new(),
            strict: true,
        }
    }

    /// Lenient store: `put` overwrites.
    pub fn lenient(state: &str) -> Self {
        Self {
            strict: false,
            ..Self::new(state)
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    fn entry(&self, key: &str) -> Result<&Entry, StoreError> {
        self.entries
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

impl Store for MemoryStore {
    fn put(&mut self, key: &str, content: Option<&[u8]>) -> Result<(), StoreError> {
        if self.strict && self.entries.contains_key(key) {
            return Err(StoreError::DuplicateKey(key.to_string()));
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                content: content.map(<[u8]>::to_vec),
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.entry(key).map(|entry| entry.content.clone())
    }

    fn list(&self) -> Result<Entries, StoreError> {
        Ok(self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.content.clone()))
            .collect())
    }

    fn replace(&mut self, key: &str, content: Option<&[u8]>) -> Result<(), StoreError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        entry.content = content.map(<[u8]>::to_vec);
        Ok(())
    }

    fn modified(&self, key: &str) -> Result<DateTime<Utc>, StoreError> {
        self.entry(key).map(|entry| entry.modified)
    }

    fn register_modify(&mut self, key: &str) -> Result<(), StoreError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        entry.modified = Utc::now();
        Ok(())
    }

    fn locate(&self, _key: Option<&str>) -> Option<String> {
        None
    }
}

/// Opens a fresh [`MemoryStore`] per state.
#[derive(Clone, Copy, Debug)]
pub struct MemoryStoreFactory {
    strict: bool,
}

impl MemoryStoreFactory {
    pub fn new() -> Self {
        Self { strict: true }
    }

    pub fn lenient() -> Self {
        Self { strict: false }
    }
}

impl Default for MemoryStoreFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreFactory for MemoryStoreFactory {
    type Store = MemoryStore;

    fn open(&mut self, state: &str) -> Result<MemoryStore, StoreError> {
        Ok(if self.strict {
            MemoryStore::new(state)
        } else {
            MemoryStore::lenient(state)
        })
    }
}
