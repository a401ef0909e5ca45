//! Monthly ledgers and their deterministic storage keys.
//!
//! A [`MonthRecord`] holds every incident row entered for one calendar
//! month. Both the local store and the remote store hold at most one
//! record per [`MonthKey`], and the key is a pure function of
//! `(year, month)`:
//!
//! ```text
//! month_<year>_<two-digit month>      e.g. month_2026_01
//! ```

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::legacy::{self, LegacyError};
use crate::row::EventRow;

/// Prefix shared by every month record key.
pub const KEY_PREFIX: &str = "month_";

/// Schema version written by this crate (the 21-field row layout).
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Schema version assumed for records written before versioning existed.
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// Portuguese month names used for display labels.
pub const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Errors produced when building or parsing a [`MonthKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The month number is outside `1..=12`.
    #[error("month must be between 1 and 12, got {month}")]
    InvalidMonth {
        /// The rejected month number.
        month: i64,
    },

    /// The year is outside `1..=9999`.
    #[error("year must be between 1 and 9999, got {year}")]
    InvalidYear {
        /// The rejected year.
        year: i64,
    },

    /// The string does not follow the `month_<year>_<MM>` scheme.
    #[error("not a month key: {0}")]
    Unparsable(String),
}

/// Identity of a monthly ledger.
///
/// Ordering is chronological: `(year, month)` compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MonthKey {
    year: u16,
    month: u8,
}

impl MonthKey {
    /// Build a key, validating the calendar ranges.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidYear`] or [`KeyError::InvalidMonth`] when
    /// either component is out of range.
    pub fn new(year: i64, month: i64) -> Result<Self, KeyError> {
        let year = u16::try_from(year)
            .ok()
            .filter(|y| (1..=9999).contains(y))
            .ok_or(KeyError::InvalidYear { year })?;
        let month = u8::try_from(month)
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or(KeyError::InvalidMonth { month })?;
        Ok(Self { year, month })
    }

    /// Calendar year.
    pub const fn year(self) -> u16 {
        self.year
    }

    /// Calendar month, `1..=12`.
    pub const fn month(self) -> u8 {
        self.month
    }

    /// The storage key, `month_<year>_<MM>`.
    pub fn storage_key(self) -> String {
        format!("{KEY_PREFIX}{}_{:02}", self.year, self.month)
    }

    /// Human display label, e.g. `Janeiro/2026`.
    pub fn label(self) -> String {
        let name = MONTH_NAMES
            .get(usize::from(self.month.saturating_sub(1)))
            .copied()
            .unwrap_or("?");
        format!("{name}/{}", self.year)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{KEY_PREFIX}{}_{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || KeyError::Unparsable(s.to_owned());
        let rest = s.strip_prefix(KEY_PREFIX).ok_or_else(unparsable)?;
        let (year, month) = rest.split_once('_').ok_or_else(unparsable)?;
        if month.len() != 2 {
            return Err(unparsable());
        }
        let year: i64 = year.parse().map_err(|_e| unparsable())?;
        let month: i64 = month.parse().map_err(|_e| unparsable())?;
        Self::new(year, month)
    }
}

/// One monthly ledger: every incident row entered for a calendar month.
///
/// `saved_at` is the last-write time and is authoritative for conflict
/// resolution between stores. `label` may be empty on records imported
/// from older backups; use [`MonthRecord::display_label`] to read it.
///
/// Decoding also accepts the positional layout (`monthLabel`, `saveDate`,
/// `data`); such records are converted to named rows on read and carry
/// [`CURRENT_SCHEMA_VERSION`] from then on. See [`crate::legacy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct MonthRecord {
    /// Calendar year.
    #[ts(type = "number")]
    pub year: i64,
    /// Calendar month. Validated by [`MonthRecord::key`], not on decode.
    #[ts(type = "number")]
    pub month: i64,
    /// Display label. Trusted when non-empty.
    pub label: String,
    /// Last-write time.
    pub saved_at: DateTime<Utc>,
    /// Incident rows in grid order.
    pub rows: Vec<EventRow>,
    /// Row schema version.
    pub schema_version: u32,
}

/// Every shape a stored month has been written in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMonth {
    year: i64,
    month: i64,
    #[serde(default, alias = "monthLabel")]
    label: String,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    save_date: Option<String>,
    #[serde(default)]
    rows: Option<Vec<EventRow>>,
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    schema_version: Option<u32>,
}

impl TryFrom<StoredMonth> for MonthRecord {
    type Error = LegacyError;

    fn try_from(stored: StoredMonth) -> Result<Self, Self::Error> {
        let (rows, schema_version) = match (stored.rows, stored.data) {
            (Some(rows), _) => (
                rows,
                stored.schema_version.unwrap_or(LEGACY_SCHEMA_VERSION),
            ),
            (None, Some(data)) => (legacy::rows_from_data(&data)?, CURRENT_SCHEMA_VERSION),
            (None, None) => (
                Vec::new(),
                stored.schema_version.unwrap_or(LEGACY_SCHEMA_VERSION),
            ),
        };
        // An unreadable write time sorts first, so any dated copy wins.
        let saved_at = stored
            .saved_at
            .or_else(|| stored.save_date.as_deref().and_then(legacy::parse_save_date))
            .unwrap_or_default();
        Ok(Self {
            year: stored.year,
            month: stored.month,
            label: stored.label,
            saved_at,
            rows,
            schema_version,
        })
    }
}

impl<'de> Deserialize<'de> for MonthRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = StoredMonth::deserialize(deserializer)?;
        Self::try_from(stored).map_err(serde::de::Error::custom)
    }
}

impl MonthRecord {
    /// Create an empty ledger for `key`, labelled and stamped.
    pub fn new(key: MonthKey, saved_at: DateTime<Utc>) -> Self {
        Self {
            year: i64::from(key.year()),
            month: i64::from(key.month()),
            label: key.label(),
            saved_at,
            rows: Vec::new(),
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// The record's key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when `year` or `month` is out of range, which
    /// marks the record as malformed.
    pub fn key(&self) -> Result<MonthKey, KeyError> {
        MonthKey::new(self.year, self.month)
    }

    /// The stored label, or one derived from `(year, month)` when empty.
    pub fn display_label(&self) -> String {
        if !self.label.trim().is_empty() {
            return self.label.clone();
        }
        self.key()
            .map_or_else(|_e| format!("{:02}/{}", self.month, self.year), MonthKey::label)
    }

    /// Rows whose primary field is filled in.
    pub fn filled_rows(&self) -> impl Iterator<Item = (usize, &EventRow)> {
        self.rows.iter().enumerate().filter(|(_, row)| !row.is_blank())
    }

    /// A copy carrying a different `saved_at`.
    #[must_use]
    pub fn stamped(&self, saved_at: DateTime<Utc>) -> Self {
        Self {
            saved_at,
            ..self.clone()
        }
    }
}
