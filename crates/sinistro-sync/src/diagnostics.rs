//! Read-only comparison of the two stores.
//!
//! Answers "what would a sync touch?" without writing anything: which
//! months exist only locally, only remotely, or on both sides, and for the
//! shared ones which side is newer.

use chrono::{DateTime, Utc};
use sinistro_store::{LocalKv, LocalMonthStore, RemoteKv, RemoteMonthStore};
use sinistro_types::{MonthKey, MonthRecord};

use crate::engine::Side;
use crate::error::{Phase, SyncError, in_phase};

/// One month as seen on one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSummary {
    /// The month.
    pub key: MonthKey,
    /// Display label.
    pub label: String,
    /// Last write time.
    pub saved_at: DateTime<Utc>,
    /// Rows with the primary field filled in.
    pub filled_rows: usize,
}

impl MonthSummary {
    fn new(key: MonthKey, record: &MonthRecord) -> Self {
        Self {
            key,
            label: record.display_label(),
            saved_at: record.saved_at,
            filled_rows: record.filled_rows().count(),
        }
    }
}

/// A month present on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedMonth {
    /// Local view.
    pub local: MonthSummary,
    /// Remote view.
    pub remote: MonthSummary,
}

impl SharedMonth {
    /// The side a sync would keep, or `None` on equal timestamps.
    pub fn newer(&self) -> Option<Side> {
        match self.local.saved_at.cmp(&self.remote.saved_at) {
            std::cmp::Ordering::Greater => Some(Side::Local),
            std::cmp::Ordering::Less => Some(Side::Remote),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Result of [`diagnose`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDiagnosis {
    /// Months only in the local store.
    pub local_only: Vec<MonthSummary>,
    /// Months only in the remote store.
    pub remote_only: Vec<MonthSummary>,
    /// Months in both stores.
    pub both: Vec<SharedMonth>,
    /// Malformed keys on either side.
    pub malformed: Vec<String>,
}

impl SyncDiagnosis {
    /// True when every month exists on both sides with equal timestamps.
    pub fn in_sync(&self) -> bool {
        self.local_only.is_empty()
            && self.remote_only.is_empty()
            && self.both.iter().all(|m| m.newer().is_none())
    }
}

/// Compare the key sets of both stores. Never writes.
///
/// # Errors
///
/// Returns [`SyncError::Aborted`] if either store cannot be scanned.
pub async fn diagnose<K: LocalKv, R: RemoteKv>(
    local: &LocalMonthStore<K>,
    remote: &RemoteMonthStore<R>,
) -> Result<SyncDiagnosis, SyncError> {
    let local_scan = local.scan().map_err(in_phase(Phase::Scan))?;
    let mut remote_scan = remote.scan().await.map_err(in_phase(Phase::Scan))?;

    let mut diagnosis = SyncDiagnosis::default();
    for (key, record) in &local_scan.records {
        match remote_scan.records.remove(key) {
            Some(theirs) => diagnosis.both.push(SharedMonth {
                local: MonthSummary::new(*key, record),
                remote: MonthSummary::new(*key, &theirs),
            }),
            None => diagnosis.local_only.push(MonthSummary::new(*key, record)),
        }
    }
    diagnosis.remote_only = remote_scan
        .records
        .iter()
        .map(|(key, record)| MonthSummary::new(*key, record))
        .collect();
    diagnosis.malformed = local_scan.malformed;
    diagnosis.malformed.extend(remote_scan.malformed);

    tracing::info!(
        local_only = diagnosis.local_only.len(),
        remote_only = diagnosis.remote_only.len(),
        both = diagnosis.both.len(),
        "sync diagnosis"
    );
    Ok(diagnosis)
}
