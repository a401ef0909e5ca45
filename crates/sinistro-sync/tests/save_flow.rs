//! End-to-end ledger workflow: guarded saves, status edits and
//! cross-month finalization, persisted through the local store.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sinistro_ledger::{
    FinalizeOutcome, FixedGate, ScriptedGate, SessionContext, SkipReason, apply_status_change,
};
use sinistro_store::{LocalMonthStore, MemoryKv, MemoryRemote, RemoteMonthStore, StoreError};
use sinistro_sync::{
    PublishOutcome, SaveOutcome, Side, open_month, reconcile, save_and_publish, save_month,
};
use sinistro_types::{EventRow, EventType, MonthKey, RecordType, RowStatus};

fn jan() -> MonthKey {
    MonthKey::new(2026, 1).unwrap()
}

fn feb() -> MonthKey {
    MonthKey::new(2026, 2).unwrap()
}

fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, 14, 0, 0).unwrap()
}

fn claim(plate: &str) -> EventRow {
    EventRow {
        association: "PORTO MAIS".to_owned(),
        beneficiary: "Joana Silva".to_owned(),
        event_type: Some(EventType::Collision),
        vehicle: "HB20 2021".to_owned(),
        plate: plate.to_owned(),
        workshop: "Oficina Central".to_owned(),
        labor: dec!(100),
        parts: dec!(50),
        status: Some(RowStatus::InProgress),
        ..EventRow::default()
    }
}

/// January saved with one open claim on `plate`.
fn store_with_january(plate: &str) -> LocalMonthStore<MemoryKv> {
    let mut store = LocalMonthStore::new(MemoryKv::new());
    let mut session = SessionContext::new(jan(), vec![claim(plate), EventRow::default()]);
    let outcome = save_month(&mut store, &mut session, &mut FixedGate::accept(), at(1, 20)).unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));
    store
}

// =============================================================================
// Duplicate guard
// =============================================================================

#[test]
fn same_month_duplicate_blocks_the_save() {
    let mut store = LocalMonthStore::new(MemoryKv::new());
    let mut session = SessionContext::new(feb(), vec![claim("abc-1234"), claim(" ABC 1234 ")]);
    let mut gate = ScriptedGate::new([true]);

    let outcome = save_month(&mut store, &mut session, &mut gate, at(2, 3)).unwrap();

    let SaveOutcome::Blocked(duplicate) = outcome else {
        panic!("expected a blocking duplicate, got {outcome:?}");
    };
    assert_eq!(duplicate.plate, "ABC1234");
    assert_eq!((duplicate.row_index, duplicate.conflicting_row), (0, 1));
    assert!(gate.prompts().is_empty(), "a block never asks the operator");
    assert!(store.get(feb()).unwrap().is_none());
}

#[test]
fn confirmed_cross_month_duplicate_persists_both_months() {
    let mut store = store_with_january("XYZ9999");
    let mut session = SessionContext::new(feb(), vec![claim("xyz-9999")]);
    let mut gate = ScriptedGate::new([true]);

    let outcome = save_month(&mut store, &mut session, &mut gate, at(2, 3)).unwrap();

    assert!(matches!(outcome, SaveOutcome::Saved(_)));
    assert_eq!(gate.prompts().len(), 1);
    assert!(gate.prompts()[0].contains("Janeiro/2026"));
    assert_eq!(store.get(feb()).unwrap().unwrap().rows.len(), 1);
    assert_eq!(store.get(jan()).unwrap().unwrap().rows[0].plate, "XYZ9999");
}

#[test]
fn declined_cross_month_duplicate_persists_nothing() {
    let mut store = store_with_january("XYZ9999");
    let writes = store.kv().write_count();
    let mut session = SessionContext::new(feb(), vec![claim("XYZ9999")]);
    let before = session.clone();

    let outcome = save_month(&mut store, &mut session, &mut FixedGate::decline(), at(2, 3)).unwrap();

    assert!(matches!(outcome, SaveOutcome::Cancelled(ref d) if d.other_month == jan()));
    assert_eq!(store.kv().write_count(), writes);
    assert!(store.get(feb()).unwrap().is_none());
    assert_eq!(session, before);
}

// =============================================================================
// Cross-month finalization
// =============================================================================

/// February session holding January's claim carried over, saved once.
fn february_with_carried_claim(store: &mut LocalMonthStore<MemoryKv>) -> SessionContext {
    let january = store.get(jan()).unwrap().unwrap();
    let mut session = open_month(store, feb()).unwrap();
    session.rows = vec![january.rows[0].clone(), EventRow::default()];
    let outcome = save_month(store, &mut session, &mut FixedGate::accept(), at(2, 3)).unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));
    session
}

#[test]
fn finalization_is_cost_neutral() {
    let mut store = store_with_january("ABC1234");
    let mut session = february_with_carried_claim(&mut store);
    let stored = store.list_all().unwrap();

    let mut gate = ScriptedGate::new([true]);
    let outcome =
        apply_status_change(&mut session, 0, RowStatus::Finalized, &stored, &mut gate).unwrap();
    let Some(FinalizeOutcome::Linked { row_index, source_month, source_row }) = outcome else {
        panic!("expected a finalization link, got {outcome:?}");
    };
    assert_eq!((row_index, source_month, source_row), (1, jan(), 0));
    assert!(gate.prompts()[0].contains("R$ 150,00"));

    let saved = save_month(&mut store, &mut session, &mut FixedGate::decline(), at(2, 27)).unwrap();
    assert!(matches!(saved, SaveOutcome::Saved(_)));

    let february = store.get(feb()).unwrap().unwrap();
    let marker = &february.rows[1];
    assert_eq!(marker.record_type, Some(RecordType::Finalization));
    assert_eq!(marker.status, Some(RowStatus::Finalized));
    assert_eq!(marker.plate, "ABC1234");
    assert_eq!(
        [marker.quota, marker.labor, marker.parts, marker.other_costs],
        [Decimal::ZERO; 4]
    );
    assert_eq!(marker.origin_month_label.as_deref(), Some("Janeiro/2026"));
    assert_eq!(marker.finalization_month_label.as_deref(), Some("Fevereiro/2026"));
    assert_eq!(
        february.rows[0].finalization_month_label.as_deref(),
        Some("Fevereiro/2026")
    );

    let january = store.get(jan()).unwrap().unwrap();
    let original = &january.rows[0];
    assert_eq!((original.labor, original.parts), (dec!(100), dec!(50)));
    assert_eq!(original.total_cost(), dec!(150));
    assert_eq!(original.status, Some(RowStatus::InProgress));
    assert_eq!(january.saved_at, at(1, 20));
}

#[test]
fn finalization_is_single_shot() {
    let mut store = store_with_january("ABC1234");
    let mut session = february_with_carried_claim(&mut store);
    let stored = store.list_all().unwrap();
    let mut gate = FixedGate::accept();

    apply_status_change(&mut session, 0, RowStatus::Finalized, &stored, &mut gate).unwrap();
    let rows_after_first = session.rows.iter().filter(|r| !r.is_blank()).count();
    let again =
        apply_status_change(&mut session, 0, RowStatus::Denied, &stored, &mut gate).unwrap();

    assert_eq!(again, Some(FinalizeOutcome::Skipped(SkipReason::AlreadyFinalized)));
    assert_eq!(session.rows.iter().filter(|r| !r.is_blank()).count(), rows_after_first);
}

#[test]
fn closing_in_the_origin_month_creates_no_link() {
    let mut store = store_with_january("ABC1234");
    let mut session = open_month(&store, jan()).unwrap();
    let stored = store.list_all().unwrap();

    let outcome =
        apply_status_change(&mut session, 0, RowStatus::Finalized, &stored, &mut FixedGate::accept())
            .unwrap();

    assert_eq!(outcome, Some(FinalizeOutcome::Skipped(SkipReason::SameMonth)));
    assert_eq!(session.rows.len(), 2);
    save_month(&mut store, &mut session, &mut FixedGate::accept(), at(1, 25)).unwrap();
    assert_eq!(
        store.get(jan()).unwrap().unwrap().rows[0].status,
        Some(RowStatus::Finalized)
    );
}

// =============================================================================
// Publishing to the shared store
// =============================================================================

#[tokio::test]
async fn saved_month_is_written_to_the_shared_store() {
    let mut local = LocalMonthStore::new(MemoryKv::new());
    let remote = RemoteMonthStore::new(MemoryRemote::new());
    let mut session = SessionContext::new(feb(), vec![claim("ABC1234")]);

    let outcome = save_and_publish(&mut local, &remote, &mut session, &mut FixedGate::accept(), at(2, 3))
        .await
        .unwrap();

    let PublishOutcome::Synced(record) = outcome else {
        panic!("expected a synced save, got {outcome:?}");
    };
    assert_eq!(record.rows[0].origin_label(), Some("Fevereiro/2026"));
    assert_eq!(remote.get(feb()).await.unwrap(), Some(record.clone()));
    assert_eq!(local.get(feb()).unwrap(), Some(record));
}

#[tokio::test]
async fn offline_shared_store_keeps_the_local_save() {
    let mut local = LocalMonthStore::new(MemoryKv::new());
    let remote = RemoteMonthStore::new(MemoryRemote::new());
    remote.kv().set_offline(true).unwrap();
    let mut session = SessionContext::new(feb(), vec![claim("ABC1234")]);

    let outcome = save_and_publish(&mut local, &remote, &mut session, &mut FixedGate::accept(), at(2, 3))
        .await
        .unwrap();

    let PublishOutcome::LocalOnly { record, error } = outcome else {
        panic!("expected a local-only save, got {outcome:?}");
    };
    assert!(matches!(error, StoreError::Unavailable(_)));
    assert_eq!(local.get(feb()).unwrap(), Some(record.clone()));

    remote.kv().set_offline(false).unwrap();
    assert!(remote.get(feb()).await.unwrap().is_none());
    let report = reconcile(&mut local, &remote, at(2, 4)).await.unwrap();
    assert_eq!(report.pushed, vec![feb()]);
    assert_eq!(remote.get(feb()).await.unwrap().unwrap().rows, record.rows);
}

#[tokio::test]
async fn stale_shared_copy_loses_to_the_local_only_save() {
    let mut local = LocalMonthStore::new(MemoryKv::new());
    let remote = RemoteMonthStore::new(MemoryRemote::new());
    let mut session = SessionContext::new(feb(), vec![claim("ABC1234")]);
    save_and_publish(&mut local, &remote, &mut session, &mut FixedGate::accept(), at(2, 3))
        .await
        .unwrap();

    remote.kv().set_offline(true).unwrap();
    session.rows[0].status = Some(RowStatus::Pending);
    let outcome = save_and_publish(&mut local, &remote, &mut session, &mut FixedGate::accept(), at(2, 5))
        .await
        .unwrap();
    assert!(matches!(outcome, PublishOutcome::LocalOnly { .. }));

    remote.kv().set_offline(false).unwrap();
    let report = reconcile(&mut local, &remote, at(2, 6)).await.unwrap();
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].winner, Side::Local);
    assert_eq!(
        remote.get(feb()).await.unwrap().unwrap().rows[0].status,
        Some(RowStatus::Pending)
    );
}

#[tokio::test]
async fn rejected_save_writes_neither_store() {
    let mut local = LocalMonthStore::new(MemoryKv::new());
    let remote = RemoteMonthStore::new(MemoryRemote::new());
    let mut refund = claim("ABC1234");
    refund.other_costs = dec!(-20);
    let mut session = SessionContext::new(feb(), vec![refund]);

    let outcome = save_and_publish(&mut local, &remote, &mut session, &mut FixedGate::accept(), at(2, 3))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        PublishOutcome::NotSaved(SaveOutcome::NegativeCost { row_index: 0 })
    ));
    assert_eq!(local.kv().write_count(), 0);
    assert_eq!(remote.kv().write_count().unwrap(), 0);
}
