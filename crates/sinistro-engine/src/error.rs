//! Error types for the sync runner binary.

/// Top-level error for the sync runner.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: sinistro_sync::ConfigError,
    },

    /// Opening or connecting a store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: sinistro_store::StoreError,
    },

    /// Reconciliation failed.
    #[error("sync error: {source}")]
    Sync {
        /// The underlying sync error.
        #[from]
        source: sinistro_sync::SyncError,
    },
}
