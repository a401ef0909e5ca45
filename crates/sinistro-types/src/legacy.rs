//! Ledgers written in the positional layout (schema version 1).
//!
//! Before rows had named fields, a month stored its grid as `data`: one
//! array of 21 cells per row, in spreadsheet column order. The month label
//! lived in `monthLabel` and the write time in `saveDate`, a `pt-BR`
//! locale string such as `10/01/2026, 14:30:00`.
//!
//! | Col | Field | Col | Field | Col | Field |
//! |-----|-------|-----|-------|-----|-------|
//! | 0 | association | 7 | quota | 14 | legal status |
//! | 1 | beneficiary | 8 | labor | 15 | legal submission date |
//! | 2 | event type | 9 | parts | 16 | recoverable value |
//! | 3 | vehicle | 10 | other costs | 17 | notes |
//! | 4 | plate | 11 | total (derived, ignored) | 18 | origin month |
//! | 5 | workshop date | 12 | status | 19 | finalization month |
//! | 6 | workshop | 13 | causer | 20 | record type |
//!
//! Conversion is all-or-nothing: a cell that cannot be read fails the
//! whole month, so a half-understood ledger is never written back.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::row::{Causer, EventRow, EventType, LegalStatus, RecordType, RowStatus};

/// Number of cells in a positional row.
pub const LEGACY_COLUMNS: usize = 21;

/// Column headers of the positional layout, for error messages.
const COLUMN_NAMES: [&str; LEGACY_COLUMNS] = [
    "ASSOCIAÇÃO",
    "BENEFICIÁRIO",
    "EVENTO TIPO",
    "VEÍCULO",
    "PLACA",
    "DATA OFICINA",
    "OFICINA",
    "COTA",
    "MÃO DE OBRA",
    "PEÇAS",
    "OUTRAS DESPESAS",
    "GASTOS TOTAIS",
    "SITUAÇÃO",
    "CAUSADOR",
    "JURÍDICO STATUS",
    "DT ENVIO JURÍDICO",
    "VALOR A RECUPERAR",
    "OBS JURÍDICO",
    "MÊS LANÇAMENTO",
    "MÊS FINALIZAÇÃO",
    "TIPO REGISTRO",
];

/// `saveDate` strings carry no zone; the ledgers were kept in Brasília time.
const BRASILIA_OFFSET_SECS: i32 = -10_800;

/// Why a positional ledger could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LegacyError {
    /// A `data` entry that is neither an array of cells nor `null`.
    #[error("row {row} is not an array of cells")]
    NotARow {
        /// Zero-based row position.
        row: usize,
    },

    /// More cells than the layout has columns.
    #[error("row {row} has {len} cells, the layout has {LEGACY_COLUMNS}")]
    TooManyCells {
        /// Zero-based row position.
        row: usize,
        /// Number of cells found.
        len: usize,
    },

    /// A cell whose value does not fit its column.
    #[error("row {row}, column {column}: {reason}")]
    Cell {
        /// Zero-based row position.
        row: usize,
        /// Column header.
        column: &'static str,
        /// What was wrong.
        reason: String,
    },
}

/// Convert a whole `data` grid.
///
/// # Errors
///
/// Returns the first [`LegacyError`] met; nothing is converted partially.
pub fn rows_from_data(data: &[Value]) -> Result<Vec<EventRow>, LegacyError> {
    data.iter()
        .enumerate()
        .map(|(row, entry)| match entry {
            Value::Null => Ok(EventRow::default()),
            Value::Array(cells) => row_from_cells(row, cells),
            _ => Err(LegacyError::NotARow { row }),
        })
        .collect()
}

/// Convert one positional row. Missing trailing cells read as empty.
///
/// # Errors
///
/// Returns [`LegacyError`] for an oversized row or an unreadable cell.
pub fn row_from_cells(row: usize, cells: &[Value]) -> Result<EventRow, LegacyError> {
    if cells.len() > LEGACY_COLUMNS {
        return Err(LegacyError::TooManyCells {
            row,
            len: cells.len(),
        });
    }
    let reader = Cells { row, cells };
    Ok(EventRow {
        association: reader.text(0)?,
        beneficiary: reader.text(1)?,
        event_type: reader.label(2, EventType::from_label)?,
        vehicle: reader.text(3)?,
        plate: reader.text(4)?,
        workshop_date: reader.date(5)?,
        workshop: reader.text(6)?,
        quota: reader.money(7)?,
        labor: reader.money(8)?,
        parts: reader.money(9)?,
        other_costs: reader.money(10)?,
        status: reader.label(12, RowStatus::from_label)?,
        causer: reader.label(13, Causer::from_label)?,
        legal_status: reader.label(14, LegalStatus::from_label)?,
        legal_submission_date: reader.date(15)?,
        recoverable_value: reader.money(16)?,
        notes: reader.text(17)?,
        origin_month_label: reader.optional_text(18)?,
        finalization_month_label: reader.optional_text(19)?,
        record_type: reader.label(20, RecordType::from_label)?,
    })
}

/// Parse a `saveDate` locale string (`dd/mm/yyyy[,] HH:MM[:SS]`) as
/// Brasília time. RFC 3339 is accepted too.
pub fn parse_save_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    let naive = [
        "%d/%m/%Y, %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y, %H:%M",
        "%d/%m/%Y %H:%M",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())?;
    FixedOffset::east_opt(BRASILIA_OFFSET_SECS)
        .and_then(|zone| naive.and_local_timezone(zone).single())
        .map(|at| at.with_timezone(&Utc))
}

/// Parse a money amount: a JSON number, or text in `pt-BR` (`1.234,56`)
/// or plain (`1234.56`) notation, optionally prefixed with `R$`.
pub fn parse_money(value: &Value) -> Option<Decimal> {
    match value {
        Value::Null => Some(Decimal::ZERO),
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => {
            let s = s.trim().trim_start_matches("R$").trim();
            if s.is_empty() {
                return Some(Decimal::ZERO);
            }
            if s.contains(',') {
                parse_decimal(&s.replace('.', "").replace(',', "."))
            } else {
                parse_decimal(s)
            }
        }
        _ => None,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok())
}

/// Typed access to the cells of one row.
struct Cells<'a> {
    row: usize,
    cells: &'a [Value],
}

impl Cells<'_> {
    fn cell(&self, column: usize) -> &Value {
        self.cells.get(column).unwrap_or(&Value::Null)
    }

    fn fail(&self, column: usize, reason: String) -> LegacyError {
        LegacyError::Cell {
            row: self.row,
            column: COLUMN_NAMES.get(column).copied().unwrap_or("?"),
            reason,
        }
    }

    fn text(&self, column: usize) -> Result<String, LegacyError> {
        match self.cell(column) {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(self.fail(column, format!("expected text, got {other}"))),
        }
    }

    fn optional_text(&self, column: usize) -> Result<Option<String>, LegacyError> {
        let text = self.text(column)?;
        Ok((!text.trim().is_empty()).then_some(text))
    }

    fn label<T>(
        &self,
        column: usize,
        parse: fn(&str) -> Option<T>,
    ) -> Result<Option<T>, LegacyError> {
        let Some(text) = self.optional_text(column)? else {
            return Ok(None);
        };
        parse(&text)
            .map(Some)
            .ok_or_else(|| self.fail(column, format!("unknown value {text:?}")))
    }

    fn date(&self, column: usize) -> Result<Option<NaiveDate>, LegacyError> {
        let Some(text) = self.optional_text(column)? else {
            return Ok(None);
        };
        let text = text.trim();
        NaiveDate::parse_from_str(text, "%d/%m/%Y")
            .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
            .map(Some)
            .map_err(|_| self.fail(column, format!("unreadable date {text:?}")))
    }

    fn money(&self, column: usize) -> Result<Decimal, LegacyError> {
        let value = self.cell(column);
        parse_money(value).ok_or_else(|| self.fail(column, format!("unreadable amount {value}")))
    }
}
