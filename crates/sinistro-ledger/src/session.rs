//! The editing session: which month is open and what the grid holds.
//!
//! Every ledger operation receives the session explicitly instead of
//! reading ambient "current month" state, so the operations are pure
//! functions of `(session, stored records)`.

use sinistro_types::{EventRow, MonthKey, MonthRecord};

use crate::LedgerError;

/// The month being edited and a snapshot of its rows.
///
/// `rows` may differ from what is persisted: it is the operator's
/// unsaved grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    month: MonthKey,
    label: String,
    /// The grid snapshot, in display order. Blank rows are unused slots.
    pub rows: Vec<EventRow>,
}

impl SessionContext {
    /// Open a session on `month` with the given grid rows.
    pub fn new(month: MonthKey, rows: Vec<EventRow>) -> Self {
        Self {
            month,
            label: month.label(),
            rows,
        }
    }

    /// Open a session on a persisted month, trusting its stored label.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MalformedRecord`] if the record's year or
    /// month is out of range.
    pub fn from_record(record: &MonthRecord) -> Result<Self, LedgerError> {
        let month = record.key().map_err(|source| LedgerError::MalformedRecord {
            label: record.label.clone(),
            source,
        })?;
        Ok(Self {
            month,
            label: record.display_label(),
            rows: record.rows.clone(),
        })
    }

    /// The month being edited.
    pub const fn month(&self) -> MonthKey {
        self.month
    }

    /// Display label of the month being edited.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrow a row, failing on an out-of-range index.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::RowOutOfRange`].
    pub fn row(&self, index: usize) -> Result<&EventRow, LedgerError> {
        self.rows.get(index).ok_or(LedgerError::RowOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    /// Mutably borrow a row, failing on an out-of-range index.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::RowOutOfRange`].
    pub fn row_mut(&mut self, index: usize) -> Result<&mut EventRow, LedgerError> {
        let len = self.rows.len();
        self.rows
            .get_mut(index)
            .ok_or(LedgerError::RowOutOfRange { index, len })
    }

    /// Stamp this month as the origin of every filled row lacking one.
    ///
    /// Returns how many rows were stamped.
    pub fn stamp_origins(&mut self) -> usize {
        let label = self.label.clone();
        self.rows
            .iter_mut()
            .filter_map(|row| row.stamp_origin(&label).then_some(()))
            .count()
    }

    /// Put `row` into the first blank slot, or append it.
    ///
    /// Never overwrites a filled row. Returns the index it landed at.
    pub fn place_row(&mut self, row: EventRow) -> usize {
        if let Some(index) = self.rows.iter().position(EventRow::is_blank) {
            if let Some(slot) = self.rows.get_mut(index) {
                *slot = row;
                return index;
            }
        }
        self.rows.push(row);
        self.rows.len().saturating_sub(1)
    }

    /// Materialize the session as a record stamped at `saved_at`.
    pub fn to_record(&self, saved_at: chrono::DateTime<chrono::Utc>) -> MonthRecord {
        MonthRecord {
            label: self.label.clone(),
            rows: self.rows.clone(),
            ..MonthRecord::new(self.month, saved_at)
        }
    }
}
