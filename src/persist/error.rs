//! Errors of the persisted engine.

use crate::core::StateError;
use crate::store::StoreError;
use thiserror::Error;

/// Failure in either the in-memory core or the backend.
///
/// A `Store` error raised after the in-memory step succeeded means memory and
/// backend have diverged; `reconcile` brings the backend's entries back in.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("backend: {0}")]
    Store(#[from] StoreError),
}
