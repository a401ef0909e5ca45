//! Error types for the sync crate.

use sinistro_ledger::LedgerError;
use sinistro_store::StoreError;

use crate::config::ConfigError;

/// Reconciliation phase, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Loading both sides.
    Scan,
    /// Writing local-only months to the remote store.
    Push,
    /// Writing remote-only months to the local store.
    Pull,
    /// Resolving months present on both sides.
    Resolve,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Scan => "scan",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Resolve => "resolve",
        })
    }
}

/// Errors that can occur during sync and save operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A store failed mid-reconciliation. Writes made by earlier steps stand.
    #[error("reconciliation aborted during {phase}: {source}")]
    Aborted {
        /// The phase that failed.
        phase: Phase,
        /// The underlying store failure.
        source: StoreError,
    },

    /// A store failed outside reconciliation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A ledger operation failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Tag a store failure with the phase it happened in.
pub(crate) fn in_phase(phase: Phase) -> impl FnOnce(StoreError) -> SyncError {
    move |source| SyncError::Aborted { phase, source }
}
