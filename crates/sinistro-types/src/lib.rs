//! Shared type definitions for the Sinistro monthly incident ledgers.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. Types flow downstream to `TypeScript` via `ts-rs` for the
//! spreadsheet editing surface.
//!
//! # Modules
//!
//! - [`month`] -- [`MonthKey`] and [`MonthRecord`], one ledger per month
//! - [`row`] -- [`EventRow`] and its closed vocabularies
//! - [`legacy`] -- Reading ledgers stored in the positional layout
//! - [`plate`] -- Plate normalization for equality comparisons
//! - [`ids`] -- Type-safe UUID wrappers for transient operations

pub mod ids;
pub mod legacy;
pub mod month;
pub mod plate;
pub mod row;

// Re-export all public types at crate root for convenience.
pub use ids::SyncRunId;
pub use legacy::LegacyError;
pub use month::{
    CURRENT_SCHEMA_VERSION, KEY_PREFIX, KeyError, LEGACY_SCHEMA_VERSION, MONTH_NAMES, MonthKey,
    MonthRecord,
};
pub use plate::normalize_plate;
pub use row::{Causer, EventRow, EventType, LegalStatus, RecordType, RowStatus};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the files to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        let _ = crate::ids::SyncRunId::export_all();
        let _ = crate::month::MonthKey::export_all();
        let _ = crate::month::MonthRecord::export_all();
        let _ = crate::row::EventRow::export_all();
        let _ = crate::row::EventType::export_all();
        let _ = crate::row::RowStatus::export_all();
        let _ = crate::row::Causer::export_all();
        let _ = crate::row::LegalStatus::export_all();
        let _ = crate::row::RecordType::export_all();
    }
}
