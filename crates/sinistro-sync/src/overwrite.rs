//! Forced one-way overwrites, for recovering from a diverged pair of stores.
//!
//! Unlike [`reconcile`](crate::engine::reconcile) these ignore timestamps
//! and make one side a copy of the other. Both are destructive and only
//! run after the operator confirms.

use chrono::{DateTime, Utc};
use sinistro_ledger::ConfirmGate;
use sinistro_store::{LocalKv, LocalMonthStore, RemoteKv, RemoteMonthStore};

use crate::error::{Phase, SyncError, in_phase};

/// Result of a forced overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteOutcome {
    /// The operator said no; nothing was written.
    Declined,
    /// The source side holds no months; nothing was written.
    EmptySource,
    /// This many months were copied.
    Written(usize),
}

/// Push every local month to the remote store, overwriting it.
///
/// Each month is stamped with `now` and written to both sides, so the pair
/// is in sync afterwards.
///
/// # Errors
///
/// Returns [`SyncError::Aborted`] if a store fails. Months already copied
/// stay copied.
pub async fn overwrite_remote<K: LocalKv, R: RemoteKv>(
    local: &mut LocalMonthStore<K>,
    remote: &RemoteMonthStore<R>,
    gate: &mut impl ConfirmGate,
    now: DateTime<Utc>,
) -> Result<OverwriteOutcome, SyncError> {
    let records = local.list_all().map_err(in_phase(Phase::Scan))?;
    if records.is_empty() {
        return Ok(OverwriteOutcome::EmptySource);
    }
    let prompt = format!(
        "Enviar TODOS os {} meses locais para a nuvem? Os dados da nuvem desses meses serão substituídos.",
        records.len()
    );
    if !gate.confirm(&prompt) {
        return Ok(OverwriteOutcome::Declined);
    }

    for record in &records {
        let stamped = record.stamped(now);
        remote.put(&stamped).await.map_err(in_phase(Phase::Push))?;
        local.put(&stamped).map_err(in_phase(Phase::Push))?;
    }
    tracing::info!(months = records.len(), "overwrote remote with local months");
    Ok(OverwriteOutcome::Written(records.len()))
}

/// Replace every local month with the remote ones.
///
/// All local month keys are removed first, then every remote month is
/// written verbatim. An empty remote aborts before anything is removed.
///
/// # Errors
///
/// Returns [`SyncError::Aborted`] if a store fails. A failure after the
/// removal step leaves the local store partially filled; rerunning
/// completes it.
pub async fn overwrite_local<K: LocalKv, R: RemoteKv>(
    local: &mut LocalMonthStore<K>,
    remote: &RemoteMonthStore<R>,
    gate: &mut impl ConfirmGate,
) -> Result<OverwriteOutcome, SyncError> {
    let records = remote
        .scan()
        .await
        .map_err(in_phase(Phase::Scan))?
        .into_records();
    if records.is_empty() {
        tracing::warn!("remote store is empty, refusing to clear local months");
        return Ok(OverwriteOutcome::EmptySource);
    }
    let prompt = format!(
        "Baixar TODOS os {} meses da nuvem? Todos os meses locais serão apagados e substituídos.",
        records.len()
    );
    if !gate.confirm(&prompt) {
        return Ok(OverwriteOutcome::Declined);
    }

    local.clear_months().map_err(in_phase(Phase::Pull))?;
    for record in &records {
        local.put(record).map_err(in_phase(Phase::Pull))?;
    }
    tracing::info!(months = records.len(), "overwrote local with remote months");
    Ok(OverwriteOutcome::Written(records.len()))
}
