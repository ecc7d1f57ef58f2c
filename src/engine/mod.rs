//! State-changing operations on tracked keys.
//!
//! The [`TransitionEngine`] is the memory-only deployment: it owns a
//! [`StateRegistry`](crate::core::StateRegistry) and an
//! [`ItemTracker`](crate::core::ItemTracker) and implements assign, move,
//! bit-set, bit-unset, masked change and sequential advance on top of them.

mod machine;

pub use machine::TransitionEngine;
