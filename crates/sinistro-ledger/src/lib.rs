//! Monthly incident ledger lifecycle for the Sinistro workspace.
//!
//! Incidents ("events") are recorded in monthly ledgers. An incident often
//! outlives the month it was opened in, so this crate tracks its identity
//! across ledger boundaries by vehicle plate. Everything here is pure: the
//! functions take a [`SessionContext`] (the month being edited and its
//! unsaved grid) plus the stored month records, and return decisions or
//! mutate only the session.
//!
//! # Modules
//!
//! - [`plate_index`] -- [`PlateIndex`]: open incidents by normalized plate.
//! - [`duplicate_guard`] -- [`validate_before_save`]: block same-month
//!   duplicates, warn on cross-month ones.
//! - [`finalizer`] -- zero-cost finalization rows for incidents closed in a
//!   later month than they were opened.
//! - [`overdue`] -- open incidents sitting at the workshop too long.
//! - [`confirm`] -- [`ConfirmGate`], the operator's yes/no prompt.
//! - [`session`] -- [`SessionContext`].
//!
//! # Cost accounting
//!
//! The row an incident was opened with is the row of record for its
//! costs. A finalization row repeats the incident's descriptive fields in
//! the month it closed, with every cost field at zero, so summing any set
//! of months never counts an incident twice.

pub mod confirm;
pub mod duplicate_guard;
pub mod finalizer;
pub mod overdue;
pub mod plate_index;
pub mod session;

// Re-export primary types at crate root.
pub use confirm::{ConfirmGate, FixedGate, ScriptedGate};
pub use duplicate_guard::{BlockingDuplicate, CrossMonthDuplicate, Decision, validate_before_save};
pub use finalizer::{
    FinalizeOutcome, SkipReason, apply_status_change, finalize_cross_month, format_brl,
};
pub use overdue::{OverdueEvent, OverdueThresholds, Urgency};
pub use plate_index::{PlateEntry, PlateIndex};
pub use session::SessionContext;

use sinistro_types::KeyError;

/// Errors raised by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A row index outside the session grid.
    #[error("row {index} is outside the grid ({len} rows)")]
    RowOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of rows in the grid.
        len: usize,
    },

    /// A month record whose year or month is invalid.
    #[error("malformed month record {label:?}: {source}")]
    MalformedRecord {
        /// The record's stored label, possibly empty.
        label: String,
        /// Why the key could not be built.
        source: KeyError,
    },
}
