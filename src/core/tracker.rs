//! Per-key state tracking.
//!
//! Keeps two indices that must always agree: a bucket of keys per state value
//! and, per key, the item row holding its current state.

use super::error::StateError;
use super::hooks::TransitionObserver;
use super::registry::StateRegistry;
use super::StateValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tracked key's current row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub state: StateValue,
    /// `None` means no content was ever supplied, distinct from empty content.
    pub content: Option<Vec<u8>>,
    pub modified: DateTime<Utc>,
}

/// Owns every tracked key together with the state buckets.
#[derive(Clone, Debug, Default)]
pub struct ItemTracker {
    buckets: HashMap<StateValue, Vec<String>>,
    items: HashMap<String, Item>,
}

impl ItemTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `key` at `state`.
    pub fn assign(
        &mut self,
        registry: &StateRegistry,
        key: &str,
        state: StateValue,
        content: Option<Vec<u8>>,
    ) -> Result<StateValue, StateError> {
        if !registry.is_registered(state) {
            return Err(StateError::UnknownState(state.to_string()));
        }
        if self.items.contains_key(key) {
            return Err(StateError::DuplicateKey(key.to_string()));
        }
        self.buckets.entry(state).or_default().push(key.to_string());
        self.items.insert(
            key.to_string(),
            Item {
                state,
                content,
                modified: Utc::now(),
            },
        );
        Ok(state)
    }

    pub fn current_state(&self, key: &str) -> Result<StateValue, StateError> {
        self.item(key).map(|item| item.state)
    }

    pub fn item(&self, key: &str) -> Result<&Item, StateError> {
        self.items
            .get(key)
            .ok_or_else(|| StateError::UnknownKey(key.to_string()))
    }

    /// Content for `key`, `None` when absent or untracked.
    pub fn content(&self, key: &str) -> Option<&[u8]> {
        self.items.get(key).and_then(|item| item.content.as_deref())
    }

    pub fn replace_content(
        &mut self,
        key: &str,
        content: Option<Vec<u8>>,
    ) -> Result<(), StateError> {
        let item = self
            .items
            .get_mut(key)
            .ok_or_else(|| StateError::UnknownKey(key.to_string()))?;
        item.content = content;
        item.modified = Utc::now();
        Ok(())
    }

    /// Keys in exactly `state`, without alias expansion.
    pub fn keys_in(&self, state: StateValue) -> &[String] {
        self.buckets.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Item)> {
        self.items.iter().map(|(key, item)| (key.as_str(), item))
    }

    fn bucket_position(&self, key: &str, state: StateValue) -> Result<usize, StateError> {
        self.buckets
            .get(&state)
            .and_then(|bucket| bucket.iter().position(|k| k == key))
            .ok_or_else(|| StateError::Corruption(format!("key '{key}' missing from bucket {state}")))
    }

    /// Move `key` from the `from` bucket into the `to` bucket.
    ///
    /// A key that is not where the reverse index says it is signals earlier
    /// corruption, not a caller mistake.
    pub(crate) fn relocate(
        &mut self,
        key: &str,
        from: StateValue,
        to: StateValue,
        observer: &dyn TransitionObserver,
    ) -> Result<(), StateError> {
        let recorded = self.current_state(key)?;
        if recorded != from {
            return Err(StateError::Corruption(format!(
                "key '{key}' recorded at {recorded}, expected {from}"
            )));
        }
        let idx = self.bucket_position(key, from)?;

        if let Some(bucket) = self.buckets.get_mut(&from) {
            bucket.remove(idx);
        }
        self.buckets.entry(to).or_default().push(key.to_string());
        if let Some(item) = self.items.get_mut(key) {
            item.state = to;
            item.modified = Utc::now();
        }

        observer.on_transition(key, to);
        Ok(())
    }

    /// Stop tracking `key` entirely.
    pub fn purge(&mut self, key: &str) -> Result<Item, StateError> {
        let state = self.current_state(key)?;
        let idx = self.bucket_position(key, state)?;
        if let Some(bucket) = self.buckets.get_mut(&state) {
            bucket.remove(idx);
        }
        self.items
            .remove(key)
            .ok_or_else(|| StateError::UnknownKey(key.to_string()))
    }

    /// Insert a row verbatim, used when restoring checkpoints.
    pub(crate) fn restore(&mut self, key: String, item: Item) -> Result<(), StateError> {
        if self.items.contains_key(&key) {
            return Err(StateError::DuplicateKey(key));
        }
        self.buckets.entry(item.state).or_default().push(key.clone());
        self.items.insert(key, item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hooks::Silent;
    use std::sync::{Arc, Mutex};

    fn registry() -> StateRegistry {
        let mut registry = StateRegistry::new(3);
        registry.add_pure("foo").unwrap();
        registry.add_pure("bar").unwrap();
        registry.add_pure("baz").unwrap();
        registry.add_alias("xyzzy", &[2, 4]).unwrap();
        registry
    }

    #[test]
    fn assign_tracks_key_in_bucket() {
        let registry = registry();
        let mut tracker = ItemTracker::new();

        tracker.assign(&registry, "a", 0, None).unwrap();
        tracker.assign(&registry, "b", 6, Some(b"data".to_vec())).unwrap();

        assert_eq!(tracker.current_state("a").unwrap(), 0);
        assert_eq!(tracker.current_state("b").unwrap(), 6);
        assert_eq!(tracker.keys_in(0), ["a".to_string()]);
        assert_eq!(tracker.keys_in(6), ["b".to_string()]);
        assert!(tracker.keys_in(1).is_empty());
        assert_eq!(tracker.content("b"), Some(&b"data"[..]));
        assert_eq!(tracker.content("a"), None);
    }

    #[test]
    fn assign_rejects_duplicates_and_unknown_states() {
        let registry = registry();
        let mut tracker = ItemTracker::new();
        tracker.assign(&registry, "a", 0, None).unwrap();

        assert_eq!(
            tracker.assign(&registry, "a", 1, None),
            Err(StateError::DuplicateKey("a".to_string()))
        );
        assert!(matches!(
            tracker.assign(&registry, "b", 3, None),
            Err(StateError::UnknownState(_))
        ));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn empty_content_is_not_absent() {
        let registry = registry();
        let mut tracker = ItemTracker::new();
        tracker.assign(&registry, "a", 0, Some(Vec::new())).unwrap();
        assert_eq!(tracker.content("a"), Some(&[][..]));
    }

    #[test]
    fn relocate_keeps_indices_consistent() {
        let registry = registry();
        let mut tracker = ItemTracker::new();
        tracker.assign(&registry, "a", 1, None).unwrap();
        tracker.assign(&registry, "b", 1, None).unwrap();

        tracker.relocate("a", 1, 2, &Silent).unwrap();

        assert_eq!(tracker.current_state("a").unwrap(), 2);
        assert_eq!(tracker.keys_in(1), ["b".to_string()]);
        assert_eq!(tracker.keys_in(2), ["a".to_string()]);
    }

    #[test]
    fn relocate_detects_wrong_source() {
        let registry = registry();
        let mut tracker = ItemTracker::new();
        tracker.assign(&registry, "a", 1, None).unwrap();

        assert!(matches!(
            tracker.relocate("a", 2, 4, &Silent),
            Err(StateError::Corruption(_))
        ));
        assert_eq!(tracker.keys_in(1), ["a".to_string()]);
    }

    #[test]
    fn relocate_notifies_observer() {
        let registry = registry();
        let mut tracker = ItemTracker::new();
        tracker.assign(&registry, "a", 0, None).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = move |key: &str, state: StateValue| {
            sink.lock().unwrap().push((key.to_string(), state));
        };

        tracker.relocate("a", 0, 1, &observer).unwrap();
        tracker.relocate("a", 1, 6, &observer).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("a".to_string(), 1), ("a".to_string(), 6)]
        );
    }

    #[test]
    fn replace_content_requires_known_key() {
        let registry = registry();
        let mut tracker = ItemTracker::new();
        tracker.assign(&registry, "a", 0, None).unwrap();

        tracker.replace_content("a", Some(b"new".to_vec())).unwrap();
        assert_eq!(tracker.content("a"), Some(&b"new"[..]));
        assert_eq!(tracker.current_state("a").unwrap(), 0);
        assert!(matches!(
            tracker.replace_content("b", None),
            Err(StateError::UnknownKey(_))
        ));
    }

    #[test]
    fn purge_removes_key_from_both_indices() {
        let registry = registry();
        let mut tracker = ItemTracker::new();
        tracker.assign(&registry, "a", 4, Some(b"x".to_vec())).unwrap();

        let item = tracker.purge("a").unwrap();
        assert_eq!(item.state, 4);
        assert!(tracker.keys_in(4).is_empty());
        assert!(matches!(
            tracker.current_state("a"),
            Err(StateError::UnknownKey(_))
        ));
        tracker.assign(&registry, "a", 0, None).unwrap();
    }
}
