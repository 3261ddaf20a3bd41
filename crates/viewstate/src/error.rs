//! Error types.
//!
//! Writes and reads never fail: `set`/`get` after disposal are silently
//! dropped. Errors only surface where a caller asks for something back, such
//! as building a dispatcher or awaiting a [`Store::snapshot`](crate::Store::snapshot).

use thiserror::Error;

/// Errors raised while creating a dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no tokio runtime is running on this thread")]
    NoRuntime,

    #[error("failed to spawn dispatcher thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by the store API.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was disposed before the request could be serviced.
    #[error("store has been disposed")]
    Disposed,

    /// [`StoreBuilder::build`](crate::StoreBuilder::build) was called without a dispatcher.
    #[error("store builder has no dispatcher")]
    MissingDispatcher,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl StoreError {
    /// Returns true if this error means the store is gone for good.
    pub fn is_disposed(&self) -> bool {
        matches!(self, StoreError::Disposed)
    }
}
