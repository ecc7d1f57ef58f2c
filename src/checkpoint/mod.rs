//! Snapshot and restore for memory-only engines.
//!
//! A memory-only deployment has no backend to reconcile from. Snapshots let
//! it survive restarts: the registry layout and every tracked item are
//! serialized to JSON (readable) or bincode (compact). Hooks are not part of a
//! snapshot and must be installed again after restoring.

use crate::core::{Item, ItemTracker, StateError, StateRegistry, StateValue};
use crate::engine::TransitionEngine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Registry layout captured by a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistryLayout {
    pub bit_width: u32,
    pub default_state: String,
    pub check_alias: bool,
    /// Pure state names in bit order.
    pub states: Vec<String>,
    pub aliases: Vec<(String, StateValue)>,
}

/// One tracked key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub key: String,
    pub item: Item,
}

/// Serializable snapshot of an engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: String,

    /// When snapshot was taken
    pub timestamp: DateTime<Utc>,

    pub registry: RegistryLayout,

    /// Items sorted by key
    pub items: Vec<ItemRecord>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(self)
    }
}

impl TransitionEngine {
    /// Capture the registry layout and every tracked item.
    pub fn snapshot(&self) -> Snapshot {
        let registry = self.registry();
        let mut items: Vec<ItemRecord> = self
            .tracker()
            .iter()
            .map(|(key, item)| ItemRecord {
                key: key.to_string(),
                item: item.clone(),
            })
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));

        Snapshot {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            registry: RegistryLayout {
                bit_width: registry.bit_width(),
                default_state: registry.default_name().to_string(),
                check_alias: self.checks_alias(),
                states: registry.pure_names().into_iter().map(String::from).collect(),
                aliases: registry
                    .aliases()
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value))
                    .collect(),
            },
            items,
        }
    }

    /// Rebuild an engine from a snapshot, with no-op hooks.
    pub fn restore(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        let layout = &snapshot.registry;
        let mut registry = StateRegistry::with_default_state(layout.bit_width, &layout.default_state)?;
        for name in &layout.states {
            registry.add_pure(name)?;
        }
        for (name, value) in &layout.aliases {
            registry.add_alias(name, &[*value])?;
        }

        let mut tracker = ItemTracker::new();
        for record in &snapshot.items {
            let state = record.item.state;
            let composite_ok = !layout.check_alias && state & !registry.registered_bits() == 0;
            if !registry.is_registered(state) && !composite_ok {
                return Err(StateError::UnknownState(state.to_string()).into());
            }
            tracker.restore(record.key.clone(), record.item.clone())?;
        }

        Ok(TransitionEngine::new(registry)
            .with_alias_check(layout.check_alias)
            .with_tracker(tracker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TransitionEngine {
        let mut registry = StateRegistry::with_default_state(3, "backlog").unwrap();
        registry.add_pure("foo").unwrap();
        registry.add_pure("bar").unwrap();
        registry.add_pure("baz").unwrap();
        registry.add_alias("xyzzy", &[1, 2]).unwrap();

        let mut engine = TransitionEngine::new(registry);
        engine.assign("a", None, None).unwrap();
        engine.assign("b", Some(3), Some(b"bee".to_vec())).unwrap();
        engine.assign("c", Some(4), Some(Vec::new())).unwrap();
        engine
    }

    #[test]
    fn snapshot_captures_layout_and_items() {
        let snapshot = engine().snapshot();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.registry.default_state, "BACKLOG");
        assert_eq!(snapshot.registry.states, vec!["FOO", "BAR", "BAZ"]);
        assert_eq!(snapshot.registry.aliases, vec![("XYZZY".to_string(), 3)]);
        let keys: Vec<&str> = snapshot.items.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn snapshot_ids_are_unique() {
        let engine = engine();
        assert_ne!(engine.snapshot().id, engine.snapshot().id);
    }

    #[test]
    fn restore_from_json_rebuilds_engine() {
        let original = engine();
        let json = original.snapshot().to_json().unwrap();
        let mut restored = TransitionEngine::restore(&Snapshot::from_json(&json).unwrap()).unwrap();

        assert_eq!(restored.current_state("b").unwrap(), 3);
        assert_eq!(restored.content("b"), Some(&b"bee"[..]));
        assert_eq!(restored.content("c"), Some(&[][..]));
        assert_eq!(restored.content("a"), None);
        assert_eq!(restored.state_name(0).unwrap(), "BACKLOG");
        assert_eq!(restored.modified("b").unwrap(), original.modified("b").unwrap());

        restored.advance("a").unwrap();
        assert_eq!(restored.keys_in(1), ["a".to_string()]);
    }

    #[test]
    fn restore_from_bytes_rebuilds_engine() {
        let bytes = engine().snapshot().to_bytes().unwrap();
        let restored = TransitionEngine::restore(&Snapshot::from_bytes(&bytes).unwrap()).unwrap();
        assert_eq!(restored.registry().value_of("xyzzy").unwrap(), 3);
        assert_eq!(restored.tracker().len(), 3);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut snapshot = engine().snapshot();
        snapshot.version = 99;
        let json = snapshot.to_json().unwrap();
        assert!(matches!(
            Snapshot::from_json(&json),
            Err(SnapshotError::UnsupportedVersion { found: 99, supported: 1 })
        ));
    }

    #[test]
    fn restore_rejects_unknown_item_states() {
        let mut snapshot = engine().snapshot();
        snapshot.items[0].item.state = 5;
        assert!(matches!(
            TransitionEngine::restore(&snapshot),
            Err(SnapshotError::ValidationFailed(StateError::UnknownState(_)))
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            Snapshot::from_bytes(&[1, 2, 3]),
            Err(SnapshotError::DeserializationFailed(_))
        ));
    }
}
