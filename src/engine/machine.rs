//! Transition engine over the registry and the tracker.

use crate::core::{
    AllowAll, Item, ItemTracker, Silent, StateError, StateRegistry, StateValue, TransitionObserver,
    TransitionVeto,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Drives every state change of every tracked key.
///
/// Each operation validates fully before touching the indices, consults the
/// veto hook, relocates the key once and notifies the observer once.
pub struct TransitionEngine {
    registry: StateRegistry,
    tracker: ItemTracker,
    veto: Box<dyn TransitionVeto>,
    observer: Box<dyn TransitionObserver>,
    check_alias: bool,
}

impl TransitionEngine {
    /// Create an engine with no-op hooks and alias checking enabled.
    pub fn new(registry: StateRegistry) -> Self {
        Self {
            registry,
            tracker: ItemTracker::new(),
            veto: Box::new(AllowAll),
            observer: Box::new(Silent),
            check_alias: true,
        }
    }

    pub fn with_veto(mut self, veto: impl TransitionVeto + 'static) -> Self {
        self.veto = Box::new(veto);
        self
    }

    pub fn with_observer(mut self, observer: impl TransitionObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// When disabled, bit-level changes may land on unregistered combinations.
    pub fn with_alias_check(mut self, check_alias: bool) -> Self {
        self.check_alias = check_alias;
        self
    }

    pub(crate) fn with_boxed_veto(mut self, veto: Box<dyn TransitionVeto>) -> Self {
        self.veto = veto;
        self
    }

    pub(crate) fn with_boxed_observer(mut self, observer: Box<dyn TransitionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub(crate) fn with_tracker(mut self, tracker: ItemTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &ItemTracker {
        &self.tracker
    }

    pub fn checks_alias(&self) -> bool {
        self.check_alias
    }

    /// Start tracking `key`, at the base state when `state` is `None`.
    pub fn assign(
        &mut self,
        key: &str,
        state: Option<StateValue>,
        content: Option<Vec<u8>>,
    ) -> Result<StateValue, StateError> {
        let state = self
            .tracker
            .assign(&self.registry, key, state.unwrap_or(0), content)?;
        debug!(key, state, "assigned");
        Ok(state)
    }

    pub fn current_state(&self, key: &str) -> Result<StateValue, StateError> {
        self.tracker.current_state(key)
    }

    pub fn content(&self, key: &str) -> Option<&[u8]> {
        self.tracker.content(key)
    }

    pub fn keys_in(&self, state: StateValue) -> &[String] {
        self.tracker.keys_in(state)
    }

    pub fn modified(&self, key: &str) -> Result<DateTime<Utc>, StateError> {
        self.tracker.item(key).map(|item| item.modified)
    }

    pub fn replace_content(&mut self, key: &str, content: Option<Vec<u8>>) -> Result<(), StateError> {
        self.current_state(key)?;
        self.tracker.replace_content(key, content)
    }

    /// Stop tracking `key`. Terminal.
    pub fn purge(&mut self, key: &str) -> Result<Item, StateError> {
        let item = self.tracker.purge(key)?;
        debug!(key, state = item.state, "purged");
        Ok(item)
    }

    /// Name under which `value` is known, used for display and for sub-stores.
    ///
    /// With alias checking disabled an unregistered combination is rendered
    /// with the composite marker instead of failing.
    pub fn state_name(&self, value: StateValue) -> Result<String, StateError> {
        if self.check_alias {
            self.registry.name_of(value).map(str::to_string)
        } else {
            self.registry.describe(value)
        }
    }

    /// Move `key` directly to any registered state.
    pub fn move_to(&mut self, key: &str, to: StateValue) -> Result<StateValue, StateError> {
        let from = self.current_state(key)?;
        if !self.registry.is_registered(to) {
            return Err(StateError::UnknownState(to.to_string()));
        }
        self.commit(key, from, to)
    }

    /// Add the pure state bit `bit` to the current value of `key`.
    pub fn set_bit(&mut self, key: &str, bit: StateValue) -> Result<StateValue, StateError> {
        self.check_pure_bit(bit)?;
        let from = self.current_state(key)?;
        let to = from | bit;
        self.resolve(to)?;
        self.commit(key, from, to)
    }

    /// Remove the pure state bit `bit` from the current value of `key`.
    ///
    /// Unsetting can never bring a key back to the base state.
    pub fn unset_bit(&mut self, key: &str, bit: StateValue) -> Result<StateValue, StateError> {
        self.check_pure_bit(bit)?;
        let from = self.current_state(key)?;
        let to = from & !bit;
        if to == from {
            return Err(StateError::InvalidTransition(format!(
                "bit {bit} not set on '{key}'"
            )));
        }
        if to == 0 {
            return Err(StateError::InvalidTransition(format!(
                "state {from} of '{key}' cannot be reverted to base"
            )));
        }
        self.resolve(to)?;
        self.commit(key, from, to)
    }

    /// Set and unset bits in one relocation.
    pub fn change(
        &mut self,
        key: &str,
        set: StateValue,
        unset: StateValue,
    ) -> Result<StateValue, StateError> {
        let registered = self.registry.registered_bits();
        if (set | unset) & !registered != 0 {
            return Err(StateError::UnknownState(format!(
                "bits {} are not registered",
                (set | unset) & !registered
            )));
        }
        let from = self.current_state(key)?;
        let to = (from | set) & !unset;
        if to == from {
            return Err(StateError::InvalidTransition(format!(
                "change leaves '{key}' at {from}"
            )));
        }
        self.resolve(to)?;
        self.commit(key, from, to)
    }

    /// Next pure state for `key`, without moving it.
    pub fn peek(&self, key: &str) -> Result<StateValue, StateError> {
        let current = self.current_state(key)?;
        if current != 0 && !StateRegistry::is_pure(current) {
            return Err(StateError::InvalidTransition(format!(
                "cannot advance '{key}' from alias state {current}"
            )));
        }
        let next = if current == 0 { 1 } else { current << 1 };
        if next == 0 || next.trailing_zeros() >= self.registry.pure_count() {
            return Err(StateError::InvalidTransition(format!(
                "no pure state after {current}"
            )));
        }
        Ok(next)
    }

    /// Move `key` to its next pure state.
    pub fn advance(&mut self, key: &str) -> Result<StateValue, StateError> {
        let from = self.current_state(key)?;
        let to = self.peek(key)?;
        self.commit(key, from, to)
    }

    fn check_pure_bit(&self, bit: StateValue) -> Result<(), StateError> {
        if !StateRegistry::is_pure(bit) {
            return Err(StateError::NotAPureState(bit));
        }
        if bit & self.registry.registered_bits() == 0 {
            return Err(StateError::UnknownState(bit.to_string()));
        }
        Ok(())
    }

    fn resolve(&self, value: StateValue) -> Result<(), StateError> {
        if self.check_alias && !self.registry.is_registered(value) {
            return Err(StateError::UnknownState(format!(
                "resulting state {value} is not registered"
            )));
        }
        Ok(())
    }

    fn commit(&mut self, key: &str, from: StateValue, to: StateValue) -> Result<StateValue, StateError> {
        if let Some(reason) = self.veto.check(&self.registry, from, to) {
            warn!(key, from, to, %reason, "transition rejected");
            return Err(StateError::TransitionRejected { from, to, reason });
        }
        self.tracker.relocate(key, from, to, self.observer.as_ref())?;
        debug!(key, from, to, "transition committed");
        Ok(to)
    }
}
