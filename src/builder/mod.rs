//! Builder API for registries and engines.
//!
//! Registries can be populated by hand, from a [`RegistryConfig`] loaded from
//! JSON, and wrapped into a [`TransitionEngine`](crate::engine::TransitionEngine)
//! with [`EngineBuilder`].

pub mod config;
pub mod engine;
pub mod error;

pub use config::{AliasConfig, RegistryConfig};
pub use engine::EngineBuilder;
pub use error::BuildError;

use crate::core::{StateError, StateRegistry};

/// Create a registry of pure states in the given order, sized to fit them.
///
/// # Example
///
/// ```
/// use bitstate::builder::linear_registry;
///
/// let registry = linear_registry(&["pending", "doing", "done"]).unwrap();
/// assert_eq!(registry.value_of("done").unwrap(), 4);
/// assert_eq!(registry.bit_width(), 3);
/// ```
pub fn linear_registry(names: &[&str]) -> Result<StateRegistry, StateError> {
    let width = u32::try_from(names.len()).unwrap_or(u32::MAX);
    let mut registry = StateRegistry::new(width);
    for name in names {
        registry.add_pure(name)?;
    }
    Ok(registry)
}
