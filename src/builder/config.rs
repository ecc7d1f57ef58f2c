//! Declarative registry configuration.

use crate::builder::error::BuildError;
use crate::core::{StateError, StateRegistry, StateValue, DEFAULT_STATE_NAME};
use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<StateError>>;

fn check(result: Result<StateValue, StateError>) -> Check {
    match result {
        Ok(_) => Validation::success(()),
        Err(e) => Validation::fail(e),
    }
}

fn default_state_name() -> String {
    DEFAULT_STATE_NAME.to_string()
}

fn enabled() -> bool {
    true
}

/// An alias over named pure states.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AliasConfig {
    pub name: String,
    pub states: Vec<String>,
}

/// Registry layout as it appears in a configuration file.
///
/// # Example
///
/// ```rust
/// use bitstate::builder::RegistryConfig;
///
/// let config = RegistryConfig::from_json(r#"{
///     "bit_width": 3,
///     "default_state": "backlog",
///     "states": ["pending", "doing", "done"],
///     "aliases": [{ "name": "active", "states": ["pending", "doing"] }]
/// }"#).unwrap();
///
/// let registry = config.build_registry().unwrap();
/// assert_eq!(registry.value_of("active").unwrap(), 3);
/// assert_eq!(registry.name_of(0).unwrap(), "BACKLOG");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub bit_width: u32,
    #[serde(default = "default_state_name")]
    pub default_state: String,
    #[serde(default = "enabled")]
    pub check_alias: bool,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<AliasConfig>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bit_width: 0,
            default_state: default_state_name(),
            check_alias: true,
            states: Vec::new(),
            aliases: Vec::new(),
        }
    }
}

impl RegistryConfig {
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        serde_json::from_str(json).map_err(|e| BuildError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, BuildError> {
        serde_json::to_string_pretty(self).map_err(|e| BuildError::Parse(e.to_string()))
    }

    /// Build the registry, reporting every invalid entry at once.
    pub fn build_registry(&self) -> Result<StateRegistry, BuildError> {
        let mut registry = StateRegistry::with_default_state(self.bit_width, &self.default_state)
            .map_err(|e| BuildError::Invalid(vec![e]))?;

        let mut checks: Vec<Check> = self
            .states
            .iter()
            .map(|name| check(registry.add_pure(name)))
            .collect();

        for alias in &self.aliases {
            let components: Result<Vec<StateValue>, StateError> = alias
                .states
                .iter()
                .map(|name| registry.value_of(name))
                .collect();
            let result = components.and_then(|values| registry.add_alias(&alias.name, &values));
            checks.push(check(result));
        }

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(registry),
            Validation::Failure(errors) => Err(BuildError::Invalid(errors.iter().cloned().collect())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = RegistryConfig::from_json(r#"{ "states": ["foo"] }"#).unwrap();
        assert_eq!(config.bit_width, 0);
        assert_eq!(config.default_state, "NEW");
        assert!(config.check_alias);
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn build_registers_states_and_aliases_in_order() {
        let config = RegistryConfig {
            bit_width: 3,
            states: vec!["foo".into(), "bar".into(), "baz".into()],
            aliases: vec![AliasConfig {
                name: "xyzzy".into(),
                states: vec!["bar".into(), "foo".into()],
            }],
            ..RegistryConfig::default()
        };
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.value_of("baz").unwrap(), 4);
        assert_eq!(registry.value_of("xyzzy").unwrap(), 3);
    }

    #[test]
    fn build_accumulates_all_errors() {
        let config = RegistryConfig {
            bit_width: 2,
            states: vec!["foo".into(), "foo".into(), "bar".into(), "baz".into()],
            aliases: vec![
                AliasConfig {
                    name: "lonely".into(),
                    states: vec!["foo".into()],
                },
                AliasConfig {
                    name: "ghost".into(),
                    states: vec!["foo".into(), "missing".into()],
                },
            ],
            ..RegistryConfig::default()
        };

        match config.build_registry() {
            Err(BuildError::Invalid(errors)) => {
                assert_eq!(errors.len(), 4);
                assert!(matches!(errors[0], StateError::NameConflict(_)));
                assert!(matches!(errors[1], StateError::CapacityExceeded { width: 2 }));
                assert!(matches!(errors[2], StateError::InvalidAliasUse(_)));
                assert!(matches!(errors[3], StateError::UnknownState(_)));
            }
            other => panic!("expected accumulated errors, got {other:?}"),
        }
    }

    #[test]
    fn invalid_default_state_fails_early() {
        let config = RegistryConfig {
            default_state: "back log".into(),
            ..RegistryConfig::default()
        };
        assert!(matches!(
            config.build_registry(),
            Err(BuildError::Invalid(errors)) if errors == vec![StateError::InvalidName("back log".into())]
        ));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RegistryConfig {
            bit_width: 2,
            states: vec!["foo".into(), "bar".into()],
            ..RegistryConfig::default()
        };
        let parsed = RegistryConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            RegistryConfig::from_json("{ states: }"),
            Err(BuildError::Parse(_))
        ));
    }
}
