//! Core bitmask state types.
//!
//! This module contains the in-memory building blocks:
//! - The state registry mapping names to bit values
//! - The item tracker holding each key's current state and content
//! - Veto and observer hooks consulted on every transition
//!
//! Nothing in here performs I/O.

mod error;
mod hooks;
mod registry;
mod tracker;

pub use error::StateError;
pub use hooks::{AllowAll, Silent, TransitionObserver, TransitionVeto};
pub use registry::{canonical_name, StateRegistry, COMPOSITE_MARKER, DEFAULT_STATE_NAME};
pub use tracker::{Item, ItemTracker};

/// Numeric state value. Bit `n` is the `n`-th pure state registered.
pub type StateValue = u64;
