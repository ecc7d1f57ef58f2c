//! Persistence backends.
//!
//! A [`Store`] holds the `(key, content)` pairs of one state; a
//! [`StoreFactory`] opens the store for a given state name. Backends differ in
//! strictness: some refuse to `put` over an existing key, others overwrite.
//! Callers see whichever behavior the backend has.

mod file;
mod memory;
#[cfg(feature = "redb")]
mod embedded;

pub use file::{FileStore, FileStoreFactory};
pub use memory::{MemoryStore, MemoryStoreFactory};
#[cfg(feature = "redb")]
pub use embedded::{RedbStore, RedbStoreFactory};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry '{0}' already exists")]
    DuplicateKey(String),

    #[error("entry '{0}' not found")]
    NotFound(String),

    /// Refused to overwrite existing content with absent content.
    #[error("will not overwrite '{0}' with empty content")]
    EmptyOverwrite(String),

    #[error("malformed record '{0}'")]
    Corrupt(String),

    /// Key cannot be stored by this backend as given.
    #[error("invalid key '{0}'")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "redb")]
    #[error(transparent)]
    Redb(#[from] redb::Error),
}

/// Entries listed from a store: key and content, `None` when absent.
pub type Entries = Vec<(String, Option<Vec<u8>>)>;

/// Persistence unit for a single state.
pub trait Store {
    /// Create an entry. Strict backends fail with [`StoreError::DuplicateKey`]
    /// if it exists.
    fn put(&mut self, key: &str, content: Option<&[u8]>) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn list(&self) -> Result<Entries, StoreError>;

    /// Overwrite an existing entry.
    fn replace(&mut self, key: &str, content: Option<&[u8]>) -> Result<(), StoreError>;

    fn modified(&self, key: &str) -> Result<DateTime<Utc>, StoreError>;

    /// Record now as the last write time of `key`.
    fn register_modify(&mut self, key: &str) -> Result<(), StoreError>;

    /// Locator of the container, or of one entry when `key` is given.
    fn locate(&self, key: Option<&str>) -> Option<String>;

    /// Whether `key` can be stored here. Checked before memory is touched.
    fn check_key(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Opens the store for a state name.
pub trait StoreFactory {
    type Store: Store;

    fn open(&mut self, state: &str) -> Result<Self::Store, StoreError>;
}
