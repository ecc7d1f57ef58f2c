//! Bitmask state registry.
//!
//! Maps human-readable state names to bit values. Pure states occupy one bit
//! each, allocated in registration order. Aliases name a union of two or more
//! pure bits.

use super::error::StateError;
use super::StateValue;
use std::collections::HashMap;

/// Name used for the base state when none is configured.
pub const DEFAULT_STATE_NAME: &str = "NEW";

/// Marker prefix used when displaying an unregistered bit combination.
pub const COMPOSITE_MARKER: char = '~';

const MAX_WIDTH: u32 = StateValue::BITS;

/// Validate a state name and return its canonical (upper-case) form.
pub fn canonical_name(name: &str) -> Result<String, StateError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid {
        return Err(StateError::InvalidName(name.to_string()));
    }
    Ok(name.to_ascii_uppercase())
}

/// Registry of pure states and aliases.
///
/// The base state always has value `0` and is always registered. Its name is a
/// per-registry setting.
///
/// # Example
///
/// ```rust
/// use bitstate::core::StateRegistry;
///
/// let mut registry = StateRegistry::new(3);
/// let foo = registry.add_pure("foo").unwrap();
/// let bar = registry.add_pure("bar").unwrap();
/// registry.add_pure("baz").unwrap();
/// let xyzzy = registry.add_alias("xyzzy", &[foo, bar]).unwrap();
///
/// assert_eq!(xyzzy, 3);
/// assert_eq!(registry.name_of(3).unwrap(), "XYZZY");
/// assert_eq!(registry.name_of(0).unwrap(), "NEW");
/// ```
#[derive(Clone, Debug)]
pub struct StateRegistry {
    bit_width: u32,
    default_name: String,
    names: HashMap<String, StateValue>,
    values: HashMap<StateValue, String>,
    pure_count: u32,
    aliases: Vec<String>,
}

impl StateRegistry {
    /// Create a registry holding at most `bit_width` pure states.
    ///
    /// A width of `0` allows growth up to the 64 bits of [`StateValue`];
    /// larger widths are clamped to 64.
    pub fn new(bit_width: u32) -> Self {
        Self {
            bit_width: bit_width.min(MAX_WIDTH),
            default_name: DEFAULT_STATE_NAME.to_string(),
            names: HashMap::new(),
            values: HashMap::new(),
            pure_count: 0,
            aliases: Vec::new(),
        }
    }

    /// Create a registry whose base state is called `default_name`.
    pub fn with_default_state(bit_width: u32, default_name: &str) -> Result<Self, StateError> {
        let mut registry = Self::new(bit_width);
        registry.default_name = canonical_name(default_name)?;
        Ok(registry)
    }

    /// Configured width, `0` meaning dynamic.
    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Name of the base state (value `0`).
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Number of pure states registered so far.
    pub fn pure_count(&self) -> u32 {
        self.pure_count
    }

    /// Union of all registered pure bits.
    pub fn registered_bits(&self) -> StateValue {
        if self.pure_count >= MAX_WIDTH {
            StateValue::MAX
        } else {
            (1 << self.pure_count) - 1
        }
    }

    fn capacity(&self) -> u32 {
        if self.bit_width == 0 {
            MAX_WIDTH
        } else {
            self.bit_width
        }
    }

    fn check_new_name(&self, name: &str) -> Result<String, StateError> {
        let name = canonical_name(name)?;
        if name == self.default_name || self.names.contains_key(&name) {
            return Err(StateError::NameConflict(name));
        }
        Ok(name)
    }

    fn insert(&mut self, name: String, value: StateValue) {
        self.names.insert(name.clone(), value);
        self.values.insert(value, name);
    }

    /// Register the next pure state, returning its bit value.
    pub fn add_pure(&mut self, name: &str) -> Result<StateValue, StateError> {
        let name = self.check_new_name(name)?;
        if self.pure_count >= self.capacity() {
            return Err(StateError::CapacityExceeded {
                width: self.capacity(),
            });
        }
        let value = 1 << self.pure_count;
        self.insert(name, value);
        self.pure_count += 1;
        Ok(value)
    }

    /// Register an alias for the union of `components`.
    ///
    /// Components may be separate pure values or already-combined integers.
    /// Every component bit must belong to a registered pure state, and the
    /// union must span at least two bits.
    pub fn add_alias(
        &mut self,
        name: &str,
        components: &[StateValue],
    ) -> Result<StateValue, StateError> {
        let name = self.check_new_name(name)?;
        let registered = self.registered_bits();
        let mut value = 0;
        for &component in components {
            if component & !registered != 0 {
                return Err(StateError::InvalidAliasUse(format!(
                    "component {component} uses unregistered bits"
                )));
            }
            value |= component;
        }
        if value.count_ones() < 2 {
            return Err(StateError::InvalidAliasUse(format!(
                "alias '{name}' must combine at least two pure states, use add_pure instead"
            )));
        }
        if let Some(existing) = self.values.get(&value) {
            return Err(StateError::NameConflict(format!(
                "{name} (value {value} already named {existing})"
            )));
        }
        self.insert(name.clone(), value);
        self.aliases.push(name);
        Ok(value)
    }

    /// Whether `value` is the base state or has a registered name.
    pub fn is_registered(&self, value: StateValue) -> bool {
        value == 0 || self.values.contains_key(&value)
    }

    /// Whether `value` is a single bit.
    pub fn is_pure(value: StateValue) -> bool {
        value.is_power_of_two()
    }

    /// Name registered for `value`; the base name for `0`.
    pub fn name_of(&self, value: StateValue) -> Result<&str, StateError> {
        if value == 0 {
            return Ok(&self.default_name);
        }
        self.values
            .get(&value)
            .map(String::as_str)
            .ok_or_else(|| StateError::UnknownState(value.to_string()))
    }

    /// Value registered under `name`, compared case-insensitively.
    pub fn value_of(&self, name: &str) -> Result<StateValue, StateError> {
        let name = canonical_name(name)?;
        if name == self.default_name {
            return Ok(0);
        }
        self.names
            .get(&name)
            .copied()
            .ok_or(StateError::UnknownState(name))
    }

    /// Decompose `value` into pure state names.
    ///
    /// Returns the exact registered name as well, the base name for `0`,
    /// when `value` is itself registered and `pure_only` is false.
    pub fn matches(&self, value: StateValue, pure_only: bool) -> (Option<&str>, Vec<&str>) {
        let alias = if pure_only {
            None
        } else {
            self.name_of(value).ok()
        };
        let components = (0..self.pure_count)
            .map(|bit| 1 << bit)
            .filter(|bit| value & bit != 0)
            .filter_map(|bit| self.values.get(&bit).map(String::as_str))
            .collect();
        (alias, components)
    }

    /// Bits still missing from `covered` relative to the coverage of `alias`.
    ///
    /// When `alias` is `None` or not registered yet, the coverage is every
    /// registered pure bit.
    pub fn mask(&self, alias: Option<&str>, covered: StateValue) -> Result<StateValue, StateError> {
        let coverage = match alias {
            Some(name) => match self.value_of(name) {
                Ok(value) => value,
                Err(StateError::UnknownState(_)) => self.registered_bits(),
                Err(e) => return Err(e),
            },
            None => self.registered_bits(),
        };
        Ok(coverage & !covered)
    }

    /// Display name for `value`.
    ///
    /// Registered values yield their name. An unregistered combination of
    /// registered bits yields the composite marker form, e.g. `~FOO,BAZ`.
    pub fn describe(&self, value: StateValue) -> Result<String, StateError> {
        if let Ok(name) = self.name_of(value) {
            return Ok(name.to_string());
        }
        if value & !self.registered_bits() != 0 {
            return Err(StateError::UnknownState(value.to_string()));
        }
        let (_, components) = self.matches(value, true);
        Ok(format!("{COMPOSITE_MARKER}{}", components.join(",")))
    }

    /// All registered names, the base name included, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .names
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(self.default_name.as_str()))
            .collect();
        names.sort_unstable();
        names
    }

    /// Pure state names in registration (bit) order.
    pub fn pure_names(&self) -> Vec<&str> {
        (0..self.pure_count)
            .filter_map(|bit| self.values.get(&(1 << bit)).map(String::as_str))
            .collect()
    }

    /// Alias names with their values, in registration order.
    pub fn aliases(&self) -> Vec<(&str, StateValue)> {
        self.aliases
            .iter()
            .filter_map(|name| self.names.get(name).map(|v| (name.as_str(), *v)))
            .collect()
    }
}
