//! Bidirectional reconciliation between the local and remote month stores.
//!
//! One pass runs three phases in a fixed order:
//!
//! | Phase | Keys | Action |
//! |-------|------|--------|
//! | Push | local only | stamp a fresh `savedAt`, write remote then local |
//! | Pull | remote only | write local verbatim |
//! | Resolve | both | strictly newer `savedAt` overwrites the other side verbatim |
//!
//! Months with equal timestamps are left alone on both sides. The pass is
//! idempotent: a second run over unchanged stores writes nothing and
//! returns an empty [`SyncReport`].
//!
//! A store failure aborts the remaining work. Nothing is rolled back;
//! every write is a whole-record upsert, so resuming is safe.

use chrono::{DateTime, Utc};
use sinistro_store::{LocalKv, LocalMonthStore, MonthScan, RemoteKv, RemoteMonthStore};
use sinistro_types::{MonthKey, MonthRecord, SyncRunId};
use tracing::Instrument;

use crate::error::{Phase, SyncError, in_phase};

/// Which store won a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The local store.
    Local,
    /// The remote store.
    Remote,
}

/// A month present on both sides with different `savedAt` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The month.
    pub key: MonthKey,
    /// The side whose record was kept.
    pub winner: Side,
    /// Local `savedAt` before the pass.
    pub local_saved_at: DateTime<Utc>,
    /// Remote `savedAt` before the pass.
    pub remote_saved_at: DateTime<Utc>,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Correlates every log line of the pass.
    pub run_id: SyncRunId,
    /// Months written to the remote store for the first time.
    pub pushed: Vec<MonthKey>,
    /// Months written to the local store for the first time.
    pub pulled: Vec<MonthKey>,
    /// Months overwritten on one side by conflict resolution.
    pub updated: Vec<MonthKey>,
    /// Every resolved conflict, with its winner.
    pub conflicts: Vec<Conflict>,
    /// Storage keys skipped because their value is malformed.
    pub malformed: Vec<String>,
}

impl SyncReport {
    fn new(run_id: SyncRunId) -> Self {
        Self {
            run_id,
            pushed: Vec::new(),
            pulled: Vec::new(),
            updated: Vec::new(),
            conflicts: Vec::new(),
            malformed: Vec::new(),
        }
    }

    /// True when the pass wrote nothing and found no conflict.
    pub fn is_empty(&self) -> bool {
        self.pushed.is_empty()
            && self.pulled.is_empty()
            && self.updated.is_empty()
            && self.conflicts.is_empty()
    }
}

/// Reconcile `local` and `remote`, stamping pushed months with `now`.
///
/// Runs inside an `info` span named `reconcile` carrying the pass's
/// [`SyncRunId`].
///
/// # Errors
///
/// Returns [`SyncError::Aborted`] with the failing [`Phase`] if either
/// store fails. Writes made before the failure are kept.
pub async fn reconcile<K: LocalKv, R: RemoteKv>(
    local: &mut LocalMonthStore<K>,
    remote: &RemoteMonthStore<R>,
    now: DateTime<Utc>,
) -> Result<SyncReport, SyncError> {
    let run_id = SyncRunId::new();
    let span = tracing::info_span!("reconcile", %run_id);
    run(local, remote, now, SyncReport::new(run_id))
        .instrument(span)
        .await
}

async fn run<K: LocalKv, R: RemoteKv>(
    local: &mut LocalMonthStore<K>,
    remote: &RemoteMonthStore<R>,
    now: DateTime<Utc>,
    mut report: SyncReport,
) -> Result<SyncReport, SyncError> {
    let MonthScan {
        records: local_records,
        malformed: local_malformed,
    } = local.scan().map_err(in_phase(Phase::Scan))?;
    let MonthScan {
        records: mut remote_records,
        malformed: remote_malformed,
    } = remote.scan().await.map_err(in_phase(Phase::Scan))?;
    report.malformed.extend(local_malformed);
    report.malformed.extend(remote_malformed);
    if !report.malformed.is_empty() {
        tracing::warn!(keys = ?report.malformed, "skipping malformed month records");
    }

    let mut both = Vec::new();
    let mut local_only = Vec::new();
    for (key, record) in local_records {
        match remote_records.remove(&key) {
            Some(theirs) => both.push((key, record, theirs)),
            None => local_only.push((key, record)),
        }
    }
    let remote_only = remote_records;

    // Push
    for (key, record) in local_only {
        let stamped = record.stamped(now);
        remote.put(&stamped).await.map_err(in_phase(Phase::Push))?;
        local.put(&stamped).map_err(in_phase(Phase::Push))?;
        tracing::debug!(%key, "pushed local-only month");
        report.pushed.push(key);
    }

    // Pull
    for (key, record) in remote_only {
        local.put(&record).map_err(in_phase(Phase::Pull))?;
        tracing::debug!(%key, saved_at = %record.saved_at, "pulled remote-only month");
        report.pulled.push(key);
    }

    // Resolve
    for (key, ours, theirs) in both {
        let Some(conflict) = resolve(local, remote, key, &ours, &theirs).await? else {
            continue;
        };
        report.updated.push(key);
        report.conflicts.push(conflict);
    }

    tracing::info!(
        pushed = report.pushed.len(),
        pulled = report.pulled.len(),
        updated = report.updated.len(),
        malformed = report.malformed.len(),
        "reconciliation complete"
    );
    Ok(report)
}

async fn resolve<K: LocalKv, R: RemoteKv>(
    local: &mut LocalMonthStore<K>,
    remote: &RemoteMonthStore<R>,
    key: MonthKey,
    ours: &MonthRecord,
    theirs: &MonthRecord,
) -> Result<Option<Conflict>, SyncError> {
    let winner = match ours.saved_at.cmp(&theirs.saved_at) {
        std::cmp::Ordering::Greater => Side::Local,
        std::cmp::Ordering::Less => Side::Remote,
        std::cmp::Ordering::Equal => {
            if ours == theirs {
                tracing::debug!(%key, "month in sync");
            } else {
                tracing::warn!(%key, saved_at = %ours.saved_at, "same savedAt but different contents, leaving both sides");
            }
            return Ok(None);
        }
    };

    match winner {
        Side::Local => remote.put(ours).await.map_err(in_phase(Phase::Resolve))?,
        Side::Remote => local.put(theirs).map_err(in_phase(Phase::Resolve))?,
    }
    tracing::info!(%key, ?winner, local_saved_at = %ours.saved_at, remote_saved_at = %theirs.saved_at, "conflict resolved");
    Ok(Some(Conflict {
        key,
        winner,
        local_saved_at: ours.saved_at,
        remote_saved_at: theirs.saved_at,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use sinistro_store::{MemoryKv, MemoryRemote};

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn month(m: i64, saved_at: DateTime<Utc>) -> MonthRecord {
        MonthRecord::new(MonthKey::new(2026, m).unwrap(), saved_at)
    }

    #[tokio::test]
    async fn phases_cover_every_key() {
        let mut local = LocalMonthStore::new(MemoryKv::new());
        let remote = RemoteMonthStore::new(MemoryRemote::new());
        local.put(&month(1, at(1))).unwrap();
        remote.put(&month(2, at(2))).await.unwrap();

        let report = reconcile(&mut local, &remote, at(10)).await.unwrap();
        assert_eq!(report.pushed, vec![MonthKey::new(2026, 1).unwrap()]);
        assert_eq!(report.pulled, vec![MonthKey::new(2026, 2).unwrap()]);
        assert!(report.conflicts.is_empty());

        let pushed = remote.get(MonthKey::new(2026, 1).unwrap()).await.unwrap().unwrap();
        assert_eq!(pushed.saved_at, at(10));
        let pulled = local.get(MonthKey::new(2026, 2).unwrap()).unwrap().unwrap();
        assert_eq!(pulled.saved_at, at(2));
    }

    #[tokio::test]
    async fn second_pass_is_empty() {
        let mut local = LocalMonthStore::new(MemoryKv::new());
        let remote = RemoteMonthStore::new(MemoryRemote::new());
        local.put(&month(1, at(1))).unwrap();
        remote.put(&month(2, at(2))).await.unwrap();

        reconcile(&mut local, &remote, at(10)).await.unwrap();
        let writes = (local.kv().write_count(), remote.kv().write_count().unwrap());
        let report = reconcile(&mut local, &remote, at(11)).await.unwrap();

        assert!(report.is_empty());
        assert_eq!((local.kv().write_count(), remote.kv().write_count().unwrap()), writes);
    }
}
