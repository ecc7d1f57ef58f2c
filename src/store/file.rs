//! Directory-per-state filesystem store.
//!
//! Each state is a directory named after the state, each key a file inside it.
//! An empty file stands for absent content.

use super::{Entries, Store, StoreError, StoreFactory};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Store backed by one directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    force: bool,
}

impl FileStore {
    /// Open (creating if needed) the directory at `path`.
    ///
    /// With `force` set, `put` overwrites existing files as long as new
    /// content is supplied.
    pub fn new(path: impl Into<PathBuf>, force: bool) -> Result<Self, StoreError> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Self { path, force })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        self.check_key(key)?;
        Ok(self.path.join(key))
    }
}

fn from_file_content(bytes: Vec<u8>) -> Option<Vec<u8>> {
    if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    }
}

impl Store for FileStore {
    fn put(&mut self, key: &str, content: Option<&[u8]>) -> Result<(), StoreError> {
        let fp = self.entry_path(key)?;
        if fp.exists() {
            if !self.force {
                return Err(StoreError::DuplicateKey(fp.display().to_string()));
            }
            if content.is_none() {
                return Err(StoreError::EmptyOverwrite(fp.display().to_string()));
            }
        }
        fs::write(&fp, content.unwrap_or_default())?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        fs::remove_file(self.entry_path(key)?)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(from_file_content(fs::read(self.entry_path(key)?)?))
    }

    fn list(&self) -> Result<Entries, StoreError> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.path)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }
            let key = dir_entry
                .file_name()
                .into_string()
                .map_err(|name| StoreError::InvalidKey(name.to_string_lossy().into_owned()))?;
            let content = from_file_content(fs::read(dir_entry.path())?);
            entries.push((key, content));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    fn replace(&mut self, key: &str, content: Option<&[u8]>) -> Result<(), StoreError> {
        let fp = self.entry_path(key)?;
        if !fp.is_file() {
            return Err(StoreError::NotFound(fp.display().to_string()));
        }
        fs::write(&fp, content.unwrap_or_default())?;
        Ok(())
    }

    fn modified(&self, key: &str) -> Result<DateTime<Utc>, StoreError> {
        let mtime = fs::metadata(self.entry_path(key)?)?.modified()?;
        Ok(DateTime::<Utc>::from(mtime))
    }

    fn register_modify(&mut self, key: &str) -> Result<(), StoreError> {
        let file = File::options().write(true).open(self.entry_path(key)?)?;
        file.set_modified(SystemTime::now())?;
        Ok(())
    }

    fn locate(&self, key: Option<&str>) -> Option<String> {
        let target = match key {
            Some(key) => self.entry_path(key).ok()?,
            None => self.path.clone(),
        };
        target.exists().then(|| target.display().to_string())
    }

    /// Keys are single file names: no separators, no `.` or `..`.
    fn check_key(&self, key: &str) -> Result<(), StoreError> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\', '\0']) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(())
    }
}

/// Opens one [`FileStore`] per state below a root directory.
#[derive(Clone, Debug)]
pub struct FileStoreFactory {
    root: PathBuf,
    force: bool,
}

impl FileStoreFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            force: false,
        }
    }

    /// Overwrite existing entries on `put` instead of failing.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StoreFactory for FileStoreFactory {
    type Store = FileStore;

    fn open(&mut self, state: &str) -> Result<FileStore, StoreError> {
        FileStore::new(self.root.join(state), self.force)
    }
}
