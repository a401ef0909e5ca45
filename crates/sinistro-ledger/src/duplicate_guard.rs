//! Pre-save validation of open plates.
//!
//! Runs before a month is persisted and yields a [`Decision`]:
//!
//! | Finding | Decision | Caller behavior |
//! |---------|----------|-----------------|
//! | Same open plate twice in this month | [`Decision::Block`] | refuse to save |
//! | Open plate already open in another month | [`Decision::WarnAndConfirm`] | save only if the operator confirms |
//! | Neither | [`Decision::Proceed`] | save |
//!
//! A same-month duplicate is a data-entry error. A cross-month duplicate
//! is the normal shape of a long-running claim and only needs awareness.

use sinistro_types::{EventRow, MonthKey, MonthRecord, RowStatus};

use crate::plate_index::PlateIndex;

/// A plate open twice in the month being saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingDuplicate {
    /// Normalized plate.
    pub plate: String,
    /// The first row carrying the plate.
    pub row_index: usize,
    /// The other row carrying the same plate.
    pub conflicting_row: usize,
    /// Status of the conflicting row.
    pub status: RowStatus,
}

/// A plate being saved that is already open in another month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossMonthDuplicate {
    /// Normalized plate.
    pub plate: String,
    /// Row in the month being saved.
    pub row_index: usize,
    /// The other month.
    pub other_month: MonthKey,
    /// Display label of the other month.
    pub other_month_label: String,
    /// Status of the row in the other month.
    pub status: RowStatus,
}

/// Outcome of [`validate_before_save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing found; save.
    Proceed,
    /// Same-month duplicate; the caller must not persist.
    Block(BlockingDuplicate),
    /// Cross-month duplicate; persist only after explicit confirmation.
    WarnAndConfirm(CrossMonthDuplicate),
}

impl Decision {
    /// The text shown to the operator, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Proceed => None,
            Self::Block(dup) => Some(format!(
                "A placa {} já existe neste mês com status {} (linhas {} e {}). \
                 Não é permitido ter a mesma placa em aberto duas vezes no mesmo mês.",
                dup.plate,
                dup.status,
                dup.row_index.saturating_add(1),
                dup.conflicting_row.saturating_add(1),
            )),
            Self::WarnAndConfirm(dup) => Some(format!(
                "A placa {} está {} em {}. Isso é normal quando um evento começa em um mês \
                 e continua no próximo. Deseja continuar salvando?",
                dup.plate, dup.status, dup.other_month_label,
            )),
        }
    }
}

/// Validate the unsaved rows of `current` against every stored month.
///
/// `records` may include a stored copy of `current`; it is replaced by
/// `rows` for the purpose of the check. Same-month duplicates are looked
/// for first across all rows, then cross-month ones; the first finding
/// of the highest severity is returned.
pub fn validate_before_save(
    rows: &[EventRow],
    current: MonthKey,
    records: &[MonthRecord],
) -> Decision {
    let index = PlateIndex::with_current(records, current, rows);
    let open_rows = || {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| row.is_open())
            .map(|(i, row)| (i, row.normalized_plate()))
            .filter(|(_, plate)| !plate.is_empty())
    };

    for (row_index, plate) in open_rows() {
        if let Some(hit) = index.find_open_in_month(&plate, current, row_index) {
            tracing::info!(%plate, row_index, conflicting_row = hit.row_index, month = %current, "blocking same-month duplicate");
            return Decision::Block(BlockingDuplicate {
                plate,
                row_index,
                conflicting_row: hit.row_index,
                status: hit.status,
            });
        }
    }

    for (row_index, plate) in open_rows() {
        if let Some(hit) = index.find_open_in_other_months(&plate, current) {
            tracing::info!(%plate, row_index, other_month = %hit.month, "plate already open in another month");
            return Decision::WarnAndConfirm(CrossMonthDuplicate {
                plate,
                row_index,
                other_month: hit.month,
                other_month_label: hit.month_label.clone(),
                status: hit.status,
            });
        }
    }

    Decision::Proceed
}
