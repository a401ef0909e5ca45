//! Error types for the storage layer.
//!
//! All errors are propagated via [`StoreError`], which wraps the
//! underlying I/O, [`serde_json`] and [`fred`] errors with context about
//! which operation failed. [`StoreError::Io`], [`StoreError::Dragonfly`],
//! [`StoreError::Timeout`] and [`StoreError::Unavailable`] mean the medium
//! itself could not be reached; callers abort on them.

use sinistro_types::KeyError;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation on the local store failed.
    #[error("local store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A remote call did not answer in time.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The configured timeout.
        timeout_ms: u64,
    },

    /// The store refused the call (offline, poisoned lock, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record or key does not map to a valid month.
    #[error("invalid month key: {0}")]
    InvalidKey(#[from] KeyError),

    /// A key contains characters the store cannot hold.
    #[error("invalid storage key: {0:?}")]
    InvalidStorageKey(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
