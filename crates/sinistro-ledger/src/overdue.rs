//! Overdue incidents: open claims sitting at the workshop too long.
//!
//! A row is overdue when it is open and its workshop date is more than
//! [`OverdueThresholds::attention_days`] in the past. Urgency escalates at
//! [`OverdueThresholds::urgent_days`] and
//! [`OverdueThresholds::critical_days`].

use chrono::NaiveDate;
use serde::Deserialize;
use sinistro_types::{EventRow, RowStatus};

/// Day counts at which an open incident becomes overdue and escalates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OverdueThresholds {
    /// Strictly more days than this makes an open row overdue.
    #[serde(default = "default_attention_days")]
    pub attention_days: u32,
    /// At or beyond this many days the row is urgent.
    #[serde(default = "default_urgent_days")]
    pub urgent_days: u32,
    /// At or beyond this many days the row is critical.
    #[serde(default = "default_critical_days")]
    pub critical_days: u32,
}

impl Default for OverdueThresholds {
    fn default() -> Self {
        Self {
            attention_days: default_attention_days(),
            urgent_days: default_urgent_days(),
            critical_days: default_critical_days(),
        }
    }
}

const fn default_attention_days() -> u32 {
    40
}

const fn default_urgent_days() -> u32 {
    60
}

const fn default_critical_days() -> u32 {
    90
}

/// How late an overdue incident is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    /// Past the attention threshold.
    Attention,
    /// Past the urgent threshold.
    Urgent,
    /// Past the critical threshold.
    Critical,
}

/// An open incident past the attention threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueEvent {
    /// Position in the month's grid.
    pub row_index: usize,
    /// Normalized plate.
    pub plate: String,
    /// Vehicle description.
    pub vehicle: String,
    /// Workshop name.
    pub workshop: String,
    /// Date the vehicle entered the workshop.
    pub workshop_date: NaiveDate,
    /// Current status.
    pub status: RowStatus,
    /// Whole days since the workshop date.
    pub days: u32,
    /// Escalation tier.
    pub urgency: Urgency,
}

/// Whole days from `date` to `today`; zero for missing or future dates.
pub fn days_since(date: Option<NaiveDate>, today: NaiveDate) -> u32 {
    date.map(|d| today.signed_duration_since(d).num_days())
        .and_then(|days| u32::try_from(days).ok())
        .unwrap_or(0)
}

impl OverdueThresholds {
    /// Tier for `days`, or `None` if not overdue.
    pub const fn classify(&self, days: u32) -> Option<Urgency> {
        if days <= self.attention_days {
            None
        } else if days >= self.critical_days {
            Some(Urgency::Critical)
        } else if days >= self.urgent_days {
            Some(Urgency::Urgent)
        } else {
            Some(Urgency::Attention)
        }
    }
}

/// Every overdue open row in `rows`, most overdue first.
pub fn scan(rows: &[EventRow], today: NaiveDate, thresholds: &OverdueThresholds) -> Vec<OverdueEvent> {
    let mut overdue: Vec<OverdueEvent> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.is_open())
        .filter_map(|(row_index, row)| {
            let workshop_date = row.workshop_date?;
            let status = row.status?;
            let days = days_since(Some(workshop_date), today);
            let urgency = thresholds.classify(days)?;
            Some(OverdueEvent {
                row_index,
                plate: row.normalized_plate(),
                vehicle: row.vehicle.clone(),
                workshop: row.workshop.clone(),
                workshop_date,
                status,
                days,
                urgency,
            })
        })
        .collect();
    overdue.sort_by(|a, b| b.days.cmp(&a.days).then(a.row_index.cmp(&b.row_index)));
    overdue
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Days;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    fn at_workshop(days_ago: u64, status: RowStatus) -> EventRow {
        EventRow {
            association: "PM".to_owned(),
            plate: format!("abc-{days_ago:04}"),
            workshop_date: today().checked_sub_days(Days::new(days_ago)),
            status: Some(status),
            ..EventRow::default()
        }
    }

    #[test]
    fn days_since_clamps_future_and_missing() {
        assert_eq!(days_since(None, today()), 0);
        let tomorrow = today().checked_add_days(Days::new(1));
        assert_eq!(days_since(tomorrow, today()), 0);
        let earlier = today().checked_sub_days(Days::new(12));
        assert_eq!(days_since(earlier, today()), 12);
    }

    #[test]
    fn thresholds_escalate() {
        let t = OverdueThresholds::default();
        assert_eq!(t.classify(40), None);
        assert_eq!(t.classify(41), Some(Urgency::Attention));
        assert_eq!(t.classify(60), Some(Urgency::Urgent));
        assert_eq!(t.classify(90), Some(Urgency::Critical));
    }

    #[test]
    fn scan_lists_open_overdue_rows_most_late_first() {
        let rows = vec![
            at_workshop(45, RowStatus::InProgress),
            at_workshop(100, RowStatus::Pending),
            at_workshop(200, RowStatus::Finalized),
            at_workshop(10, RowStatus::InProgress),
            at_workshop(61, RowStatus::Agreement),
            EventRow::default(),
        ];
        let overdue = scan(&rows, today(), &OverdueThresholds::default());
        let found: Vec<(usize, Urgency)> = overdue.iter().map(|e| (e.row_index, e.urgency)).collect();
        assert_eq!(
            found,
            vec![(1, Urgency::Critical), (4, Urgency::Urgent), (0, Urgency::Attention)]
        );
        assert_eq!(overdue[0].plate, "ABC0100");
        assert_eq!(overdue[0].days, 100);
    }

    #[test]
    fn rows_without_workshop_date_are_never_overdue() {
        let mut row = at_workshop(100, RowStatus::Pending);
        row.workshop_date = None;
        assert!(scan(&[row], today(), &OverdueThresholds::default()).is_empty());
    }
}
