//! Reconciliation and save workflow for the Sinistro monthly ledgers.
//!
//! The operator edits months locally; a shared remote store lets several
//! machines see the same ledgers. This crate keeps the two in agreement
//! and wraps the ledger rules around every local save.
//!
//! # Modules
//!
//! - [`engine`] -- [`reconcile`]: push, pull, then last-write-wins per month
//! - [`diagnostics`] -- [`diagnose`]: read-only comparison of both stores
//! - [`overwrite`] -- forced one-way copies, behind a confirmation
//! - [`save`] -- [`save_month`]: duplicate-guarded save with origin stamps,
//!   and [`save_and_publish`] which also writes the shared store
//! - [`config`] -- `sinistro-config.yaml` loading
//! - [`error`] -- [`SyncError`]
//!
//! Status edits and cross-month finalization live in
//! [`sinistro_ledger::finalizer`]; they mutate the session only and are
//! persisted by the next [`save_month`].

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod overwrite;
pub mod save;

// Re-export primary types at crate root.
pub use config::{ConfigError, SyncConfig};
pub use diagnostics::{MonthSummary, SharedMonth, SyncDiagnosis, diagnose};
pub use engine::{Conflict, Side, SyncReport, reconcile};
pub use error::{Phase, SyncError};
pub use overwrite::{OverwriteOutcome, overwrite_local, overwrite_remote};
pub use save::{PublishOutcome, SaveOutcome, open_month, save_and_publish, save_month};
