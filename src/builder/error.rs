//! Build errors for registries and engines.

use crate::core::StateError;
use thiserror::Error;

/// Errors that can occur when building registries and engines.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No state registry given. Call .registry(..) or .config(..) before .build()")]
    MissingRegistry,

    #[error("Configuration could not be parsed: {0}")]
    Parse(String),

    #[error("Configuration has {} error(s): {}", .0.len(), join(.0))]
    Invalid(Vec<StateError>),
}

fn join(errors: &[StateError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
