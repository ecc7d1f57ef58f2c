//! Mirrors engine transitions into a store backend.

use super::error::PersistError;
use crate::core::{Item, StateError, StateRegistry, StateValue};
use crate::engine::TransitionEngine;
use crate::store::{Store, StoreError, StoreFactory};
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// A [`TransitionEngine`] whose every transition is mirrored into one
/// sub-store per state name.
///
/// Each operation first runs in memory, then copies the entry from the old
/// state's sub-store into the new one and deletes the old copy. The sequence
/// is not atomic. A failure part way leaves either a duplicate entry or a
/// backend one step behind memory; [`reconcile`](Self::reconcile) imports
/// whatever the backend holds.
pub struct PersistenceSynchronizer<F: StoreFactory> {
    engine: TransitionEngine,
    factory: F,
    stores: HashMap<String, F::Store>,
}

impl<F: StoreFactory> PersistenceSynchronizer<F> {
    pub fn new(engine: TransitionEngine, factory: F) -> Self {
        Self {
            engine,
            factory,
            stores: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    pub fn registry(&self) -> &StateRegistry {
        self.engine.registry()
    }

    pub fn into_parts(self) -> (TransitionEngine, F) {
        (self.engine, self.factory)
    }

    fn ensure_store(&mut self, name: &str) -> Result<&mut F::Store, StoreError> {
        match self.stores.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                debug!(state = name, "opening sub-store");
                let store = self.factory.open(name)?;
                Ok(entry.insert(store))
            }
        }
    }

    /// Sub-store for `state`, opened on demand.
    pub fn store_mut(&mut self, state: StateValue) -> Result<&mut F::Store, PersistError> {
        let name = self.engine.state_name(state)?;
        Ok(self.ensure_store(&name)?)
    }

    pub fn current_state(&self, key: &str) -> Result<StateValue, StateError> {
        self.engine.current_state(key)
    }

    pub fn content(&self, key: &str) -> Option<&[u8]> {
        self.engine.content(key)
    }

    /// Keys in `state`, from memory. The backend is not consulted.
    pub fn keys_in(&self, state: StateValue) -> &[String] {
        self.engine.keys_in(state)
    }

    pub fn peek(&self, key: &str) -> Result<StateValue, StateError> {
        self.engine.peek(key)
    }

    /// Track `key` and persist it in its initial state's sub-store.
    pub fn assign(
        &mut self,
        key: &str,
        state: Option<StateValue>,
        content: Option<Vec<u8>>,
    ) -> Result<StateValue, PersistError> {
        let name = self
            .engine
            .registry()
            .name_of(state.unwrap_or(0))?
            .to_string();
        self.ensure_store(&name)?.check_key(key)?;

        let to = self.engine.assign(key, state, content.clone())?;
        let store = self.ensure_store(&name)?;
        store.put(key, content.as_deref())?;
        store.register_modify(key)?;
        debug!(key, state = %name, "persisted new entry");
        Ok(to)
    }

    pub fn move_to(&mut self, key: &str, to: StateValue) -> Result<StateValue, PersistError> {
        let from = self.engine.current_state(key)?;
        let to = self.engine.move_to(key, to)?;
        self.move_store(key, from, to)
    }

    pub fn set_bit(&mut self, key: &str, bit: StateValue) -> Result<StateValue, PersistError> {
        let from = self.engine.current_state(key)?;
        let to = self.engine.set_bit(key, bit)?;
        self.move_store(key, from, to)
    }

    pub fn unset_bit(&mut self, key: &str, bit: StateValue) -> Result<StateValue, PersistError> {
        let from = self.engine.current_state(key)?;
        let to = self.engine.unset_bit(key, bit)?;
        self.move_store(key, from, to)
    }

    pub fn change(
        &mut self,
        key: &str,
        set: StateValue,
        unset: StateValue,
    ) -> Result<StateValue, PersistError> {
        let from = self.engine.current_state(key)?;
        let to = self.engine.change(key, set, unset)?;
        self.move_store(key, from, to)
    }

    pub fn advance(&mut self, key: &str) -> Result<StateValue, PersistError> {
        let from = self.engine.current_state(key)?;
        let to = self.engine.advance(key)?;
        self.move_store(key, from, to)
    }

    fn move_store(
        &mut self,
        key: &str,
        from: StateValue,
        to: StateValue,
    ) -> Result<StateValue, PersistError> {
        let from_name = self.engine.state_name(from)?;
        let to_name = self.engine.state_name(to)?;
        if from_name == to_name {
            return Ok(to);
        }

        let content = self.ensure_store(&from_name)?.get(key)?;
        self.ensure_store(&to_name)?.put(key, content.as_deref())?;
        self.ensure_store(&from_name)?.remove(key)?;
        self.ensure_store(&to_name)?.register_modify(key)?;

        debug!(key, from = %from_name, to = %to_name, "moved persisted entry");
        Ok(to)
    }

    /// Replace content in memory and in the current sub-store.
    pub fn replace_content(
        &mut self,
        key: &str,
        content: Option<Vec<u8>>,
    ) -> Result<(), PersistError> {
        self.engine.replace_content(key, content.clone())?;
        let name = self.engine.state_name(self.engine.current_state(key)?)?;
        let store = self.ensure_store(&name)?;
        store.replace(key, content.as_deref())?;
        store.register_modify(key)?;
        Ok(())
    }

    /// Stop tracking `key` and delete its backend entry.
    pub fn purge(&mut self, key: &str) -> Result<Item, PersistError> {
        let item = self.engine.purge(key)?;
        let name = self.engine.state_name(item.state)?;
        self.ensure_store(&name)?.remove(key)?;
        Ok(item)
    }

    /// Import backend entries into memory.
    ///
    /// Covers `state` only, or every registered state when `None`. Keys
    /// already tracked are left alone, and keys known only to memory are never
    /// removed. Returns the number of keys imported.
    pub fn reconcile(&mut self, state: Option<StateValue>) -> Result<usize, PersistError> {
        let targets: Vec<(String, StateValue)> = match state {
            Some(value) => vec![(self.engine.state_name(value)?, value)],
            None => {
                let registry = self.engine.registry();
                registry
                    .names()
                    .into_iter()
                    .map(|name| registry.value_of(name).map(|value| (name.to_string(), value)))
                    .collect::<Result<_, StateError>>()?
            }
        };

        let mut imported = 0;
        for (name, value) in targets {
            let entries = self.ensure_store(&name)?.list()?;
            let mut count = 0;
            for (key, content) in entries {
                match self.engine.assign(&key, Some(value), content) {
                    Ok(_) => count += 1,
                    Err(StateError::DuplicateKey(_)) => {
                        trace!(key = %key, state = %name, "already tracked");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            if count > 0 {
                info!(state = %name, imported = count, "reconciled sub-store");
            }
            imported += count;
        }
        Ok(imported)
    }

    /// Locator of the sub-store for `state`, or of `key` within it.
    ///
    /// `None` when the sub-store has not been opened yet or the backend has
    /// no locator for it.
    pub fn locate(&self, state: StateValue, key: Option<&str>) -> Result<Option<String>, PersistError> {
        let name = self.engine.state_name(state)?;
        Ok(self.stores.get(&name).and_then(|store| store.locate(key)))
    }

    /// Last write time of `key` as recorded by its current sub-store.
    pub fn last_modified(&mut self, key: &str) -> Result<DateTime<Utc>, PersistError> {
        let name = self.engine.state_name(self.engine.current_state(key)?)?;
        Ok(self.ensure_store(&name)?.modified(key)?)
    }
}
