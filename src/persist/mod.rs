//! Persistence synchronization.
//!
//! Wraps a [`TransitionEngine`](crate::engine::TransitionEngine) and a
//! [`StoreFactory`](crate::store::StoreFactory) so that every transition is
//! mirrored into the backend, and backend contents can be pulled back into
//! memory after a restart or a partial failure.

mod error;
mod synchronizer;

pub use error::PersistError;
pub use synchronizer::PersistenceSynchronizer;
