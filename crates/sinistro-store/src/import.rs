//! Bulk import of month records from a backup document.
//!
//! Each entry is a loose JSON object. Only `year` and `month` are
//! mandatory; everything else falls back to a sensible default. A bad
//! entry is counted and skipped, never fatal to the batch.
//!
//! Backups taken before rows had named fields carry `data` (positional
//! cells) and `saveDate` instead of `rows` and `savedAt`; both shapes are
//! read. See [`sinistro_types::legacy`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use sinistro_types::legacy::{self, LegacyError};
use sinistro_types::{CURRENT_SCHEMA_VERSION, EventRow, MonthKey, MonthRecord};

use crate::error::StoreError;
use crate::local::LocalKv;
use crate::month_store::LocalMonthStore;

/// Outcome of an import batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Entries written to the store.
    pub imported: usize,
    /// Entries rejected.
    pub errors: usize,
}

/// Why a single backup entry was rejected.
#[derive(Debug, thiserror::Error)]
enum EntryError {
    #[error("entry is not an object")]
    NotAnObject,
    #[error("missing or non-numeric `{0}`")]
    MissingField(&'static str),
    #[error(transparent)]
    Key(#[from] sinistro_types::KeyError),
    #[error("unreadable rows: {0}")]
    Rows(#[from] serde_json::Error),
    #[error("unreadable positional rows: {0}")]
    Positional(#[from] LegacyError),
    #[error("`data` is not an array")]
    DataNotAnArray,
}

fn integer_field(entry: &serde_json::Map<String, Value>, name: &'static str) -> Result<i64, EntryError> {
    match entry.get(name) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or(EntryError::MissingField(name))
}

fn parse_entry(entry: Value, now: DateTime<Utc>) -> Result<MonthRecord, EntryError> {
    let Value::Object(mut entry) = entry else {
        return Err(EntryError::NotAnObject);
    };
    let key = MonthKey::new(integer_field(&entry, "year")?, integer_field(&entry, "month")?)?;

    let label = entry
        .get("label")
        .or_else(|| entry.get("monthLabel"))
        .and_then(Value::as_str)
        .filter(|label| !label.trim().is_empty())
        .map_or_else(|| key.label(), str::to_owned);

    let saved_at = entry
        .get("savedAt")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.with_timezone(&Utc))
        .or_else(|| {
            entry
                .get("saveDate")
                .and_then(Value::as_str)
                .and_then(legacy::parse_save_date)
        })
        .unwrap_or(now);

    let rows: Vec<EventRow> = match (entry.remove("rows"), entry.remove("data")) {
        (Some(Value::Null) | None, Some(Value::Array(cells))) => legacy::rows_from_data(&cells)?,
        (Some(Value::Null) | None, Some(Value::Null) | None) => Vec::new(),
        (Some(Value::Null) | None, Some(_)) => return Err(EntryError::DataNotAnArray),
        (Some(rows), _) => serde_json::from_value(rows)?,
    };

    let mut record = MonthRecord::new(key, saved_at);
    record.label = label;
    record.rows = rows;
    record.schema_version = entry
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(CURRENT_SCHEMA_VERSION);
    Ok(record)
}

/// Import every entry of `months` into `store`, overwriting existing months.
///
/// # Errors
///
/// Returns [`StoreError`] only if the store itself fails; malformed entries
/// are counted in [`ImportReport::errors`].
pub fn import_records<K: LocalKv>(
    store: &mut LocalMonthStore<K>,
    months: Vec<Value>,
    now: DateTime<Utc>,
) -> Result<ImportReport, StoreError> {
    let mut report = ImportReport::default();
    for (position, entry) in months.into_iter().enumerate() {
        match parse_entry(entry, now) {
            Ok(record) => {
                store.put(&record)?;
                report.imported = report.imported.saturating_add(1);
            }
            Err(error) => {
                tracing::warn!(position, %error, "skipping backup entry");
                report.errors = report.errors.saturating_add(1);
            }
        }
    }
    tracing::info!(imported = report.imported, errors = report.errors, "backup import finished");
    Ok(report)
}
