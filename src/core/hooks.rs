//! Veto and observer hooks for state transitions.
//!
//! A veto may reject a transition before anything is mutated. An observer is
//! told about every transition after it has been committed. Both are injected
//! strategy objects; the no-op implementations [`AllowAll`] and [`Silent`]
//! stand in when nothing is configured.

use super::registry::StateRegistry;
use super::StateValue;

/// Decides whether a transition may proceed.
///
/// Returning `Some(reason)` aborts the transition with
/// [`StateError::TransitionRejected`](super::StateError::TransitionRejected).
///
/// Any closure with the matching signature is a veto:
///
/// ```rust
/// use bitstate::core::{StateRegistry, StateValue, TransitionVeto};
///
/// let no_way_back = |_: &StateRegistry, from: StateValue, to: StateValue| {
///     (to != 0 && to < from).then(|| "cannot move backwards".to_string())
/// };
///
/// let registry = StateRegistry::new(2);
/// assert!(no_way_back.check(&registry, 1, 2).is_none());
/// assert!(no_way_back.check(&registry, 2, 1).is_some());
/// ```
pub trait TransitionVeto: Send + Sync {
    fn check(&self, registry: &StateRegistry, from: StateValue, to: StateValue) -> Option<String>;
}

/// Veto that never objects.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl TransitionVeto for AllowAll {
    fn check(&self, _registry: &StateRegistry, _from: StateValue, _to: StateValue) -> Option<String> {
        None
    }
}

impl<F> TransitionVeto for F
where
    F: Fn(&StateRegistry, StateValue, StateValue) -> Option<String> + Send + Sync,
{
    fn check(&self, registry: &StateRegistry, from: StateValue, to: StateValue) -> Option<String> {
        self(registry, from, to)
    }
}

/// Receives every committed transition, in commit order.
pub trait TransitionObserver: Send + Sync {
    fn on_transition(&self, key: &str, state: StateValue);
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl TransitionObserver for Silent {
    fn on_transition(&self, _key: &str, _state: StateValue) {}
}

impl<F> TransitionObserver for F
where
    F: Fn(&str, StateValue) + Send + Sync,
{
    fn on_transition(&self, key: &str, state: StateValue) {
        self(key, state)
    }
}
