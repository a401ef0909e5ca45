//! Index of open incidents by normalized plate, across every month.
//!
//! The index is derived: it is rebuilt from month records on demand and
//! never cached across mutations. Only rows that are filled in, carry a
//! plate, and have an open status are indexed.
//!
//! Two queries drive the duplicate guard and the cross-month finalizer:
//!
//! - [`PlateIndex::find_open_in_month`] -- is this plate open elsewhere in
//!   the same month?
//! - [`PlateIndex::find_open_in_other_months`] -- is this plate open in a
//!   different month? Most recent month wins, then lowest row.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use sinistro_types::{EventRow, MonthKey, MonthRecord, RowStatus, normalize_plate};

/// Where an open incident lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateEntry {
    /// The month holding the row.
    pub month: MonthKey,
    /// Display label of that month.
    pub month_label: String,
    /// Position of the row in the month's grid.
    pub row_index: usize,
    /// The row's (open) status.
    pub status: RowStatus,
}

/// Open incidents keyed by normalized plate.
#[derive(Debug, Clone, Default)]
pub struct PlateIndex {
    open: BTreeMap<String, Vec<PlateEntry>>,
}

impl PlateIndex {
    /// Build the index from persisted records.
    ///
    /// Records with an invalid year or month are skipped.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a MonthRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            match record.key() {
                Ok(month) => index.insert_month(month, &record.display_label(), &record.rows),
                Err(error) => {
                    tracing::warn!(%error, label = %record.label, "skipping malformed month in plate index");
                }
            }
        }
        index
    }

    /// Build the index with the month being edited replaced by its
    /// unsaved grid.
    ///
    /// The stored copy of `current` (if any) only contributes its label.
    pub fn with_current(records: &[MonthRecord], current: MonthKey, rows: &[EventRow]) -> Self {
        let mut current_label = current.label();
        let mut index = Self::build(records.iter().filter(|record| {
            let is_current = record.key().is_ok_and(|key| key == current);
            if is_current {
                current_label = record.display_label();
            }
            !is_current
        }));
        index.insert_month(current, &current_label, rows);
        index
    }

    fn insert_month(&mut self, month: MonthKey, label: &str, rows: &[EventRow]) {
        for (row_index, row) in rows.iter().enumerate() {
            let Some(status) = row.status.filter(|_| row.is_open()) else {
                continue;
            };
            let plate = row.normalized_plate();
            if plate.is_empty() {
                continue;
            }
            self.open.entry(plate).or_default().push(PlateEntry {
                month,
                month_label: label.to_owned(),
                row_index,
                status,
            });
        }
    }

    /// Number of distinct open plates.
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Whether no open plate was indexed.
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Every open occurrence of `plate` (normalized before lookup).
    pub fn entries(&self, plate: &str) -> &[PlateEntry] {
        self.open
            .get(&normalize_plate(plate))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First other open row in `month` with the same plate, skipping the
    /// row at `excluding_row`.
    pub fn find_open_in_month(
        &self,
        plate: &str,
        month: MonthKey,
        excluding_row: usize,
    ) -> Option<&PlateEntry> {
        self.entries(plate)
            .iter()
            .filter(|entry| entry.month == month && entry.row_index != excluding_row)
            .min_by_key(|entry| entry.row_index)
    }

    /// The open occurrence of `plate` in any month other than
    /// `excluding_month`: most recent month first, then lowest row.
    pub fn find_open_in_other_months(
        &self,
        plate: &str,
        excluding_month: MonthKey,
    ) -> Option<&PlateEntry> {
        self.entries(plate)
            .iter()
            .filter(|entry| entry.month != excluding_month)
            .min_by_key(|entry| (Reverse(entry.month), entry.row_index))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn key(year: i64, month: i64) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    fn row(plate: &str, status: RowStatus) -> EventRow {
        EventRow {
            association: "PM".to_owned(),
            plate: plate.to_owned(),
            status: Some(status),
            ..EventRow::default()
        }
    }

    fn month(year: i64, m: i64, rows: Vec<EventRow>) -> MonthRecord {
        MonthRecord {
            rows,
            ..MonthRecord::new(key(year, m), Utc::now())
        }
    }

    #[test]
    fn only_open_filled_rows_with_plates_are_indexed() {
        let blank_primary = EventRow {
            plate: "ZZZ0000".to_owned(),
            status: Some(RowStatus::Pending),
            ..EventRow::default()
        };
        let records = vec![month(
            2026,
            1,
            vec![
                row("ABC1234", RowStatus::InProgress),
                row("DEF5678", RowStatus::Finalized),
                row("", RowStatus::Pending),
                blank_primary,
            ],
        )];
        let index = PlateIndex::build(&records);
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries("abc-1234").len(), 1);
        assert!(index.entries("DEF5678").is_empty());
        assert!(index.entries("ZZZ0000").is_empty());
    }

    #[test]
    fn same_month_lookup_excludes_the_row_itself() {
        let records = vec![month(
            2026,
            1,
            vec![row("ABC1234", RowStatus::Pending), row("abc 1234", RowStatus::Agreement)],
        )];
        let index = PlateIndex::build(&records);
        let hit = index.find_open_in_month("ABC1234", key(2026, 1), 0).unwrap();
        assert_eq!(hit.row_index, 1);
        assert_eq!(hit.status, RowStatus::Agreement);
        assert!(index.find_open_in_month("ABC1234", key(2026, 2), 0).is_none());
    }

    #[test]
    fn single_occurrence_is_not_a_same_month_match() {
        let records = vec![month(2026, 1, vec![row("ABC1234", RowStatus::Pending)])];
        let index = PlateIndex::build(&records);
        assert!(index.find_open_in_month("ABC1234", key(2026, 1), 0).is_none());
    }

    #[test]
    fn other_month_lookup_prefers_most_recent() {
        let records = vec![
            month(2025, 11, vec![row("XYZ9999", RowStatus::Pending)]),
            month(2026, 1, vec![EventRow::default(), row("XYZ9999", RowStatus::InProgress)]),
            month(2025, 12, vec![row("XYZ9999", RowStatus::Agreement)]),
            month(2026, 2, vec![row("XYZ9999", RowStatus::InProgress)]),
        ];
        let index = PlateIndex::build(&records);
        let hit = index
            .find_open_in_other_months("xyz-9999", key(2026, 2))
            .unwrap();
        assert_eq!(hit.month, key(2026, 1));
        assert_eq!(hit.row_index, 1);
        assert_eq!(hit.month_label, "Janeiro/2026");
    }

    #[test]
    fn other_month_lookup_ignores_excluded_month() {
        let records = vec![month(2026, 2, vec![row("XYZ9999", RowStatus::Pending)])];
        let index = PlateIndex::build(&records);
        assert!(index.find_open_in_other_months("XYZ9999", key(2026, 2)).is_none());
    }

    #[test]
    fn unsaved_grid_replaces_stored_current_month() {
        let mut stored_feb = month(2026, 2, vec![row("OLD0001", RowStatus::Pending)]);
        stored_feb.label = "FEV/26".to_owned();
        let records = vec![
            month(2026, 1, vec![row("XYZ9999", RowStatus::Pending)]),
            stored_feb,
        ];
        let grid = vec![row("NEW0002", RowStatus::Pending)];
        let index = PlateIndex::with_current(&records, key(2026, 2), &grid);
        assert!(index.entries("OLD0001").is_empty());
        let entry = &index.entries("NEW0002")[0];
        assert_eq!(entry.month_label, "FEV/26");
        assert_eq!(index.entries("XYZ9999").len(), 1);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let mut bad = month(2026, 1, vec![row("ABC1234", RowStatus::Pending)]);
        bad.month = 14;
        let index = PlateIndex::build(&[bad]);
        assert!(index.is_empty());
    }
}
