//! Embedded ordered key-value store on top of redb.
//!
//! All states share one table. Entries live under `"<STATE>.<key>"` and their
//! last write time, as big-endian milliseconds, under `"_mod<STATE>.<key>"`.
//! `put` overwrites existing entries.

use super::{Entries, Store, StoreError, StoreFactory};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("bitstate");

const MOD_PREFIX: &str = "_mod";

/// Store for one state inside a shared redb database.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    state: String,
}

impl RedbStore {
    fn to_path(&self, key: &str) -> String {
        format!("{}.{}", self.state, key)
    }

    fn to_mod_path(&self, key: &str) -> String {
        format!("{MOD_PREFIX}{}.{}", self.state, key)
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, redb::Error> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        Ok(table.get(path)?.map(|v| v.value().to_vec()))
    }

    fn write(&self, path: &str, value: &[u8]) -> Result<(), redb::Error> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ENTRIES)?;
            table.insert(path, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn delete(&self, paths: &[&str]) -> Result<bool, redb::Error> {
        let txn = self.db.begin_write()?;
        let existed;
        {
            let mut table = txn.open_table(ENTRIES)?;
            existed = table.remove(paths[0])?.is_some();
            for path in &paths[1..] {
                table.remove(*path)?;
            }
        }
        txn.commit()?;
        Ok(existed)
    }

    fn scan(&self) -> Result<Entries, redb::Error> {
        let prefix = format!("{}.", self.state);
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ENTRIES)?;
        let mut entries = Vec::new();
        for row in table.range(prefix.as_str()..)? {
            let (key, value) = row?;
            let Some(key) = key.value().strip_prefix(prefix.as_str()).map(str::to_string) else {
                break;
            };
            let value = value.value();
            let content = (!value.is_empty()).then(|| value.to_vec());
            entries.push((key, content));
        }
        Ok(entries)
    }
}

impl Store for RedbStore {
    fn put(&mut self, key: &str, content: Option<&[u8]>) -> Result<(), StoreError> {
        self.write(&self.to_path(key), content.unwrap_or_default())?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.to_path(key);
        let mod_path = self.to_mod_path(key);
        if !self.delete(&[&path, &mod_path])? {
            return Err(StoreError::NotFound(path));
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.to_path(key);
        let value = self.read(&path)?.ok_or(StoreError::NotFound(path))?;
        Ok((!value.is_empty()).then_some(value))
    }

    fn list(&self) -> Result<Entries, StoreError> {
        Ok(self.scan()?)
    }

    fn replace(&mut self, key: &str, content: Option<&[u8]>) -> Result<(), StoreError> {
        let path = self.to_path(key);
        if self.read(&path)?.is_none() {
            return Err(StoreError::NotFound(path));
        }
        self.write(&path, content.unwrap_or_default())?;
        Ok(())
    }

    fn modified(&self, key: &str) -> Result<DateTime<Utc>, StoreError> {
        let path = self.to_mod_path(key);
        let raw = self.read(&path)?.ok_or_else(|| StoreError::NotFound(path.clone()))?;
        let millis: [u8; 8] = raw
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Corrupt(path.clone()))?;
        DateTime::<Utc>::from_timestamp_millis(i64::from_be_bytes(millis))
            .ok_or(StoreError::Corrupt(path))
    }

    fn register_modify(&mut self, key: &str) -> Result<(), StoreError> {
        let millis = Utc::now().timestamp_millis().to_be_bytes();
        self.write(&self.to_mod_path(key), &millis)?;
        Ok(())
    }

    fn locate(&self, key: Option<&str>) -> Option<String> {
        Some(match key {
            Some(key) => self.to_path(key),
            None => self.state.clone(),
        })
    }
}

/// Opens [`RedbStore`]s sharing one database file.
#[derive(Clone)]
pub struct RedbStoreFactory {
    db: Arc<Database>,
}

impl RedbStoreFactory {
    /// Create or open the database at `path` and make sure the table exists.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::init(path)?)
    }

    fn init(path: &Path) -> Result<Self, redb::Error> {
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        txn.open_table(ENTRIES)?;
        txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl StoreFactory for RedbStoreFactory {
    type Store = RedbStore;

    fn open(&mut self, state: &str) -> Result<RedbStore, StoreError> {
        Ok(RedbStore {
            db: Arc::clone(&self.db),
            state: state.to_string(),
        })
    }
}
