//! Bitstate: a bitmask state tracker with pluggable persistence
//!
//! Every tracked key sits in exactly one state. States are bit values: each
//! pure state owns one bit, aliases name combinations of pure states, and the
//! base state is always 0. Keys move between states through a transition
//! engine that can consult a veto hook and notifies an observer, and can be
//! mirrored into per-state sub-stores by the persistence synchronizer.
//!
//! # Core Concepts
//!
//! - **Registry**: names to bit values, pure states and aliases
//! - **Tracker**: each key's current state, content and modification time
//! - **Engine**: validated moves, bit sets and clears, sequential advance
//! - **Synchronizer**: mirrors the engine into a [`store::Store`] per state
//!
//! # Example
//!
//! ```rust
//! use bitstate::core::StateRegistry;
//! use bitstate::engine::TransitionEngine;
//!
//! let mut registry = StateRegistry::new(3);
//! let foo = registry.add_pure("foo").unwrap();
//! let bar = registry.add_pure("bar").unwrap();
//! registry.add_pure("baz").unwrap();
//! let xyzzy = registry.add_alias("xyzzy", &[foo, bar]).unwrap();
//!
//! let mut engine = TransitionEngine::new(registry);
//! engine.assign("ticket-1", None, None).unwrap();
//! assert_eq!(engine.advance("ticket-1").unwrap(), foo);
//! assert_eq!(engine.set_bit("ticket-1", bar).unwrap(), xyzzy);
//! assert_eq!(engine.state_name(xyzzy).unwrap(), "XYZZY");
//! ```

pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod engine;
pub mod persist;
pub mod store;

// Re-export commonly used types
pub use builder::{EngineBuilder, RegistryConfig};
pub use checkpoint::Snapshot;
pub use core::{Item, StateError, StateRegistry, StateValue};
pub use engine::TransitionEngine;
pub use persist::{PersistError, PersistenceSynchronizer};
pub use store::{Store, StoreError, StoreFactory};
