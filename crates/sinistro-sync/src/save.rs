//! Guarded save of the month being edited.
//!
//! Saving never writes before the row checks have passed:
//!
//! 1. A filled row with a negative cost field stops here.
//! 2. [`validate_before_save`] runs against the session grid plus every
//!    stored month. A same-month duplicate stops here.
//! 3. A cross-month duplicate asks the operator; "no" stops here.
//! 4. Filled rows without an origin are stamped with this month.
//! 5. The month is written locally with `savedAt = now`.
//!
//! [`save_and_publish`] adds a sixth step: the saved month is written to
//! the shared store. A shared-store failure keeps the local save and is
//! reported as [`PublishOutcome::LocalOnly`]; the next
//! [`reconcile`](crate::reconcile) pushes the month since its local copy
//! is newer.

use chrono::{DateTime, Utc};
use sinistro_ledger::{
    BlockingDuplicate, ConfirmGate, CrossMonthDuplicate, Decision, SessionContext,
    validate_before_save,
};
use sinistro_store::{LocalKv, LocalMonthStore, RemoteKv, RemoteMonthStore, StoreError};
use sinistro_types::{MonthKey, MonthRecord};

use crate::error::SyncError;

/// Result of [`save_month`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A filled row has a cost field below zero; nothing was written.
    NegativeCost {
        /// Grid position of the first offending row.
        row_index: usize,
    },
    /// Same-month duplicate; nothing was written.
    Blocked(BlockingDuplicate),
    /// The operator declined a cross-month duplicate; nothing was written.
    Cancelled(CrossMonthDuplicate),
    /// The month was written.
    Saved(MonthRecord),
}

/// Result of [`save_and_publish`].
#[derive(Debug)]
pub enum PublishOutcome {
    /// The local save did not happen; the inner outcome says why.
    NotSaved(SaveOutcome),
    /// Saved locally and written to the shared store.
    Synced(MonthRecord),
    /// Saved locally; the shared store write failed.
    LocalOnly {
        /// The month as saved locally.
        record: MonthRecord,
        /// Why the shared store write failed.
        error: StoreError,
    },
}

/// Open a session on `key`: the stored month if there is one, else an
/// empty grid.
///
/// # Errors
///
/// Returns [`SyncError::Store`] if the store fails.
pub fn open_month<K: LocalKv>(
    store: &LocalMonthStore<K>,
    key: MonthKey,
) -> Result<SessionContext, SyncError> {
    match store.get(key)? {
        Some(record) => Ok(SessionContext::from_record(&record)?),
        None => Ok(SessionContext::new(key, Vec::new())),
    }
}

/// Validate and persist the session's month.
///
/// On [`SaveOutcome::Saved`] the session's rows carry their origin stamps.
/// On any other outcome neither the session nor the store is touched.
///
/// # Errors
///
/// Returns [`SyncError::Store`] if the store fails.
pub fn save_month<K: LocalKv>(
    store: &mut LocalMonthStore<K>,
    session: &mut SessionContext,
    gate: &mut impl ConfirmGate,
    now: DateTime<Utc>,
) -> Result<SaveOutcome, SyncError> {
    if let Some(row_index) = session
        .rows
        .iter()
        .position(|row| !row.is_blank() && row.has_negative_cost())
    {
        tracing::warn!(month = %session.month(), row_index, "save blocked by negative cost");
        return Ok(SaveOutcome::NegativeCost { row_index });
    }

    let stored = store.list_all()?;
    let decision = validate_before_save(&session.rows, session.month(), &stored);
    let prompt = decision.message();
    match decision {
        Decision::Proceed => {}
        Decision::Block(duplicate) => {
            tracing::warn!(plate = %duplicate.plate, row_index = duplicate.row_index, "save blocked by same-month duplicate");
            return Ok(SaveOutcome::Blocked(duplicate));
        }
        Decision::WarnAndConfirm(duplicate) => {
            if !gate.confirm(prompt.as_deref().unwrap_or_default()) {
                tracing::info!(plate = %duplicate.plate, "save cancelled by operator");
                return Ok(SaveOutcome::Cancelled(duplicate));
            }
        }
    }

    let stamped = session.stamp_origins();
    let record = session.to_record(now);
    store.put(&record)?;
    tracing::info!(month = %session.month(), rows = record.rows.len(), stamped, "month saved");
    Ok(SaveOutcome::Saved(record))
}

/// [`save_month`], then write the saved month to the shared store.
///
/// # Errors
///
/// Returns [`SyncError::Store`] if the local store fails. Shared-store
/// failures are not errors; see [`PublishOutcome::LocalOnly`].
pub async fn save_and_publish<K: LocalKv, R: RemoteKv>(
    local: &mut LocalMonthStore<K>,
    remote: &RemoteMonthStore<R>,
    session: &mut SessionContext,
    gate: &mut impl ConfirmGate,
    now: DateTime<Utc>,
) -> Result<PublishOutcome, SyncError> {
    let record = match save_month(local, session, gate, now)? {
        SaveOutcome::Saved(record) => record,
        other => return Ok(PublishOutcome::NotSaved(other)),
    };
    match remote.put(&record).await {
        Ok(()) => {
            tracing::info!(month = %session.month(), "month saved and synced");
            Ok(PublishOutcome::Synced(record))
        }
        Err(error) => {
            tracing::warn!(month = %session.month(), %error, "month saved locally only");
            Ok(PublishOutcome::LocalOnly { record, error })
        }
    }
}
