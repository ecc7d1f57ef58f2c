//! Builder for constructing transition engines.

use crate::builder::config::RegistryConfig;
use crate::builder::error::BuildError;
use crate::core::{StateRegistry, TransitionObserver, TransitionVeto};
use crate::engine::TransitionEngine;

/// Builder for constructing engines with a fluent API.
pub struct EngineBuilder {
    registry: Option<StateRegistry>,
    check_alias: bool,
    veto: Option<Box<dyn TransitionVeto>>,
    observer: Option<Box<dyn TransitionObserver>>,
}

impl EngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            registry: None,
            check_alias: true,
            veto: None,
            observer: None,
        }
    }

    /// Use an already populated registry.
    pub fn registry(mut self, registry: StateRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the registry from configuration, also taking its alias check flag.
    /// Returns an error if the configuration fails validation.
    pub fn config(mut self, config: &RegistryConfig) -> Result<Self, BuildError> {
        self.registry = Some(config.build_registry()?);
        self.check_alias = config.check_alias;
        Ok(self)
    }

    /// Enable or disable resolution checks after bit-level changes.
    pub fn check_alias(mut self, enabled: bool) -> Self {
        self.check_alias = enabled;
        self
    }

    /// Set the veto hook (optional).
    pub fn veto(mut self, veto: impl TransitionVeto + 'static) -> Self {
        self.veto = Some(Box::new(veto));
        self
    }

    /// Set the observer hook (optional).
    pub fn observer(mut self, observer: impl TransitionObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Build the engine.
    /// Returns an error if no registry was given.
    pub fn build(self) -> Result<TransitionEngine, BuildError> {
        let registry = self.registry.ok_or(BuildError::MissingRegistry)?;
        let mut engine = TransitionEngine::new(registry).with_alias_check(self.check_alias);
        if let Some(veto) = self.veto {
            engine = engine.with_boxed_veto(veto);
        }
        if let Some(observer) = self.observer {
            engine = engine.with_boxed_observer(observer);
        }
        Ok(engine)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StateError, StateValue};
    use std::sync::{Arc, Mutex};

    fn config() -> RegistryConfig {
        RegistryConfig::from_json(
            r#"{ "bit_width": 3, "states": ["foo", "bar", "baz"], "check_alias": false }"#,
        )
        .unwrap()
    }

    #[test]
    fn builder_requires_registry() {
        let result = EngineBuilder::new().build();
        assert!(matches!(result, Err(BuildError::MissingRegistry)));
    }

    #[test]
    fn config_sets_alias_checking() {
        let mut engine = EngineBuilder::new().config(&config()).unwrap().build().unwrap();
        assert!(!engine.checks_alias());

        engine.assign("k", Some(1), None).unwrap();
        assert_eq!(engine.set_bit("k", 4).unwrap(), 5);
    }

    #[test]
    fn explicit_flag_overrides_config() {
        let engine = EngineBuilder::new()
            .config(&config())
            .unwrap()
            .check_alias(true)
            .build()
            .unwrap();
        assert!(engine.checks_alias());
    }

    #[test]
    fn fluent_api_installs_hooks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut registry = StateRegistry::new(2);
        registry.add_pure("foo").unwrap();
        registry.add_pure("bar").unwrap();

        let mut engine = EngineBuilder::new()
            .registry(registry)
            .veto(|_: &StateRegistry, _from: StateValue, to: StateValue| {
                (to == 2).then(|| "bar is frozen".to_string())
            })
            .observer(move |_: &str, state: StateValue| sink.lock().unwrap().push(state))
            .build()
            .unwrap();

        engine.assign("k", None, None).unwrap();
        engine.advance("k").unwrap();
        assert!(matches!(
            engine.advance("k"),
            Err(StateError::TransitionRejected { .. })
        ));
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }
}
