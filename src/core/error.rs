//! Errors raised by the registry, the tracker and the transition engine.

use super::StateValue;
use thiserror::Error;

/// Every validation failure of the in-memory core.
///
/// All of these are raised before any index mutation takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state '{0}' already exists")]
    NameConflict(String),

    #[error("unknown state: {0}")]
    UnknownState(String),

    #[error("bit width {width} exhausted, cannot add another pure state")]
    CapacityExceeded { width: u32 },

    #[error("invalid alias: {0}")]
    InvalidAliasUse(String),

    #[error("invalid state name '{0}', only letters and underscores are allowed")]
    InvalidName(String),

    #[error("key '{0}' is already tracked")]
    DuplicateKey(String),

    #[error("key '{0}' is not tracked")]
    UnknownKey(String),

    #[error("value {0} is not a single-bit state")]
    NotAPureState(StateValue),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("transition {from} -> {to} rejected: {reason}")]
    TransitionRejected {
        from: StateValue,
        to: StateValue,
        reason: String,
    },

    /// The state index and the reverse index disagree.
    #[error("state index corrupted: {0}")]
    Corruption(String),
}
