//! Property-based tests for registries and the transition engine.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use bitstate::core::{StateError, StateRegistry, StateValue};
use bitstate::engine::TransitionEngine;
use bitstate::persist::PersistenceSynchronizer;
use bitstate::store::{MemoryStoreFactory, Store};
use proptest::prelude::*;

/// Alphabetic name for the `i`-th generated state.
fn state_name(mut i: usize) -> String {
    let mut name = String::from("S");
    loop {
        name.push((b'A' + (i % 26) as u8) as char);
        i /= 26;
        if i == 0 {
            break;
        }
    }
    name
}

fn registry_with(count: usize) -> StateRegistry {
    let mut registry = StateRegistry::new(count as u32);
    for i in 0..count {
        registry.add_pure(&state_name(i)).unwrap();
    }
    registry
}

prop_compose! {
    /// A registry size together with a non-empty subset of its bits.
    fn sized_subset()(count in 2usize..16)
        (subset in 1u64..(1u64 << count), count in Just(count)) -> (usize, u64) {
        (count, subset)
    }
}

proptest! {
    #[test]
    fn pure_states_are_consecutive_powers_of_two(count in 1usize..64) {
        let mut registry = StateRegistry::new(count as u32);
        for i in 0..count {
            let value = registry.add_pure(&state_name(i)).unwrap();
            prop_assert_eq!(value, 1u64 << i);
        }
        let overflow = registry.add_pure("OVERFLOW");
        let is_capacity_error = matches!(overflow, Err(StateError::CapacityExceeded { .. }));
        prop_assert!(is_capacity_error);
    }

    #[test]
    fn alias_value_is_union_of_components((count, subset) in sized_subset()) {
        prop_assume!(subset.count_ones() >= 2);
        let mut registry = registry_with(count);
        let components: Vec<StateValue> = (0..count)
            .map(|bit| 1u64 << bit)
            .filter(|bit| subset & bit != 0)
            .collect();

        let value = registry.add_alias("COMBO", &components).unwrap();
        prop_assert_eq!(value, subset);
        prop_assert_eq!(registry.name_of(subset).unwrap(), "COMBO");

        let (alias, parts) = registry.matches(subset, false);
        prop_assert_eq!(alias, Some("COMBO"));
        prop_assert_eq!(parts.len(), subset.count_ones() as usize);
    }

    #[test]
    fn describe_never_fails_for_registered_bits((count, subset) in sized_subset()) {
        let registry = registry_with(count);
        let described = registry.describe(subset).unwrap();
        if subset.count_ones() == 1 {
            prop_assert_eq!(described, state_name(subset.trailing_zeros() as usize));
        } else {
            prop_assert!(described.starts_with('~'));
        }
    }

    #[test]
    fn peek_is_idempotent(count in 1usize..20, steps in 0usize..20) {
        let mut engine = TransitionEngine::new(registry_with(count));
        engine.assign("k", None, None).unwrap();
        for _ in 0..steps.min(count - 1) {
            engine.advance("k").unwrap();
        }
        let before = engine.current_state("k").unwrap();
        let first = engine.peek("k");
        let second = engine.peek("k");
        prop_assert_eq!(first, second);
        prop_assert_eq!(engine.current_state("k").unwrap(), before);
    }

    #[test]
    fn advance_visits_every_pure_state_in_order(count in 1usize..40) {
        let mut engine = TransitionEngine::new(registry_with(count));
        engine.assign("k", None, None).unwrap();
        for bit in 0..count {
            prop_assert_eq!(engine.advance("k").unwrap(), 1u64 << bit);
        }
        let past_end = matches!(engine.advance("k"), Err(StateError::InvalidTransition(_)));
        prop_assert!(past_end);
        prop_assert_eq!(engine.keys_in(1u64 << (count - 1)).len(), 1);
    }

    #[test]
    fn set_then_unset_returns_to_start(count in 2usize..16, a in 0usize..16, b in 0usize..16) {
        let start = 1u64 << (a % count);
        let bit = 1u64 << (b % count);
        prop_assume!(start != bit);

        let mut engine = TransitionEngine::new(registry_with(count)).with_alias_check(false);
        engine.assign("k", Some(start), None).unwrap();

        prop_assert_eq!(engine.set_bit("k", bit).unwrap(), start | bit);
        prop_assert_eq!(engine.unset_bit("k", bit).unwrap(), start);
        prop_assert_eq!(engine.keys_in(start).len(), 1);
        prop_assert!(engine.keys_in(start | bit).is_empty());
    }

    #[test]
    fn reconcile_is_idempotent(keys in prop::collection::btree_set("[a-z]{1,8}", 0..20)) {
        let mut sync = PersistenceSynchronizer::new(
            TransitionEngine::new(registry_with(3)),
            MemoryStoreFactory::new(),
        );
        for (i, key) in keys.iter().enumerate() {
            let state = 1u64 << (i % 3);
            sync.store_mut(state).unwrap().put(key, Some(key.as_bytes())).unwrap();
        }

        prop_assert_eq!(sync.reconcile(None).unwrap(), keys.len());
        prop_assert_eq!(sync.reconcile(None).unwrap(), 0);
        for key in &keys {
            prop_assert_eq!(sync.content(key), Some(key.as_bytes()));
        }
    }
}
