//! Cross-month finalization.
//!
//! An incident opened in January and closed in March must show up in
//! March's ledger as closed without counting its cost twice. When a row
//! is set to a closed status in a month other than its origin, the
//! finalizer appends a zero-cost [`RecordType::Finalization`] row to the
//! current month and leaves the cost-bearing original untouched.
//!
//! # Decision table
//!
//! | origin label | origin == current | already finalized | action |
//! |--------------|-------------------|-------------------|--------|
//! | empty | -- | -- | none |
//! | set | yes | -- | none |
//! | set | no | yes | none |
//! | set | no | no | finalize |

use rust_decimal::{Decimal, RoundingStrategy};
use sinistro_types::{EventRow, MonthKey, MonthRecord, RecordType, RowStatus};

use crate::confirm::ConfirmGate;
use crate::plate_index::PlateIndex;
use crate::session::SessionContext;
use crate::LedgerError;

/// Why no finalization row was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The row's status is not closed.
    NotClosed,
    /// The row is an unused grid slot.
    BlankRow,
    /// The row has no origin month, so no cross-month history.
    NoOrigin,
    /// The row is being closed in the month it was opened.
    SameMonth,
    /// A finalization month is already recorded.
    AlreadyFinalized,
}

/// Outcome of [`finalize_cross_month`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The decision table says there is nothing to do.
    Skipped(SkipReason),
    /// No open row with this plate exists in another month.
    SourceNotFound,
    /// The operator declined the confirmation.
    Declined,
    /// A finalization row was placed in the current month.
    Linked {
        /// Where the finalization row landed in the session grid.
        row_index: usize,
        /// Month holding the cost-bearing original.
        source_month: MonthKey,
        /// Row of the original in that month.
        source_row: usize,
    },
}

/// Apply the decision table to `row` being closed in `current_label`.
pub fn check(row: &EventRow, current_label: &str) -> Result<(), SkipReason> {
    if !row.status.is_some_and(RowStatus::is_closed) {
        return Err(SkipReason::NotClosed);
    }
    if row.is_blank() {
        return Err(SkipReason::BlankRow);
    }
    let origin = row.origin_label().ok_or(SkipReason::NoOrigin)?;
    if origin == current_label {
        return Err(SkipReason::SameMonth);
    }
    if row.is_finalized_elsewhere() {
        return Err(SkipReason::AlreadyFinalized);
    }
    Ok(())
}

/// Build the zero-cost closure marker for `source`.
///
/// Descriptive and legal fields are copied; the four cost fields are
/// zero; notes cross-reference both months.
pub fn finalization_row(
    source: &EventRow,
    status: RowStatus,
    source_label: &str,
    current_label: &str,
) -> EventRow {
    EventRow {
        association: source.association.clone(),
        beneficiary: source.beneficiary.clone(),
        event_type: source.event_type,
        vehicle: source.vehicle.clone(),
        plate: source.plate.clone(),
        workshop_date: source.workshop_date,
        workshop: source.workshop.clone(),
        status: Some(status),
        causer: source.causer,
        legal_status: source.legal_status,
        legal_submission_date: source.legal_submission_date,
        recoverable_value: source.recoverable_value,
        notes: format!("Finalizado em {current_label} - Lançado em {source_label}"),
        origin_month_label: Some(source_label.to_owned()),
        finalization_month_label: Some(current_label.to_owned()),
        record_type: Some(RecordType::Finalization),
        ..EventRow::default()
    }
}

/// Run cross-month finalization for the session row at `row_index`,
/// whose status has just been set to a closed value.
///
/// The operator is shown the original's costs and must confirm before
/// anything changes. On success the finalization row is placed in the
/// first blank slot of the session grid and the edited row records the
/// current month as its finalization month. `stored` is never modified.
///
/// # Errors
///
/// Returns [`LedgerError::RowOutOfRange`] if `row_index` is not in the grid.
pub fn finalize_cross_month(
    session: &mut SessionContext,
    row_index: usize,
    stored: &[MonthRecord],
    gate: &mut impl ConfirmGate,
) -> Result<FinalizeOutcome, LedgerError> {
    let row = session.row(row_index)?;
    if let Err(reason) = check(row, session.label()) {
        tracing::debug!(row_index, ?reason, "no cross-month finalization");
        return Ok(FinalizeOutcome::Skipped(reason));
    }
    let Some(status) = row.status else {
        return Ok(FinalizeOutcome::Skipped(SkipReason::NotClosed));
    };
    let plate = row.normalized_plate();

    let index = PlateIndex::build(stored);
    let Some(entry) = index.find_open_in_other_months(&plate, session.month()) else {
        tracing::info!(%plate, month = %session.month(), "no open source row in another month, closing in place");
        return Ok(FinalizeOutcome::SourceNotFound);
    };
    let Some(source) = stored
        .iter()
        .find(|record| record.key().is_ok_and(|key| key == entry.month))
        .and_then(|record| record.rows.get(entry.row_index))
    else {
        return Ok(FinalizeOutcome::SourceNotFound);
    };

    let prompt = format!(
        "Finalizar evento de outro mês? Placa {plate} encontrada em {source_label}. \
         Gastos originais: {total}. {source_label} mantém o evento original com gastos; \
         {current_label} recebe um registro de finalização sem gastos.",
        source_label = entry.month_label,
        total = format_brl(source.total_cost()),
        current_label = session.label(),
    );
    if !gate.confirm(&prompt) {
        tracing::info!(%plate, "cross-month finalization declined");
        return Ok(FinalizeOutcome::Declined);
    }

    let current_label = session.label().to_owned();
    let marker = finalization_row(source, status, &entry.month_label, &current_label);
    session.row_mut(row_index)?.mark_finalized_in(&current_label);
    let placed = session.place_row(marker);

    tracing::info!(
        %plate,
        source_month = %entry.month,
        source_row = entry.row_index,
        row_index = placed,
        "finalization row created"
    );
    Ok(FinalizeOutcome::Linked {
        row_index: placed,
        source_month: entry.month,
        source_row: entry.row_index,
    })
}

/// Set the status of a session row and, for closed statuses, run
/// cross-month finalization.
///
/// Returns `None` when the new status is open.
///
/// # Errors
///
/// Returns [`LedgerError::RowOutOfRange`] if `row_index` is not in the grid.
pub fn apply_status_change(
    session: &mut SessionContext,
    row_index: usize,
    status: RowStatus,
    stored: &[MonthRecord],
    gate: &mut impl ConfirmGate,
) -> Result<Option<FinalizeOutcome>, LedgerError> {
    session.row_mut(row_index)?.status = Some(status);
    if status.is_open() {
        return Ok(None);
    }
    finalize_cross_month(session, row_index, stored, gate).map(Some)
}

/// Format an amount in Brazilian reais the way operators read it:
/// `R$ 1.234,56`. Rounds half away from zero to centavos.
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let plain = format!("{:.2}", rounded.abs());
    let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let reversed: Vec<char> = whole.chars().rev().collect();
    let mut groups: Vec<String> = reversed
        .chunks(3)
        .map(|group| group.iter().rev().collect())
        .collect();
    groups.reverse();
    format!("{sign}R$ {},{cents}", groups.join("."))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sinistro_types::{Causer, EventType, LegalStatus};

    use super::*;
    use crate::confirm::{FixedGate, ScriptedGate};

    fn key(year: i64, month: i64) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    fn january_claim() -> EventRow {
        EventRow {
            association: "PORTO MAIS".to_owned(),
            beneficiary: "Maria".to_owned(),
            event_type: Some(EventType::Collision),
            vehicle: "Onix 2020".to_owned(),
            plate: "ABC-1234".to_owned(),
            workshop: "Oficina Central".to_owned(),
            labor: dec!(100),
            parts: dec!(50),
            status: Some(RowStatus::InProgress),
            causer: Some(Causer::ThirdParty),
            legal_status: Some(LegalStatus::Collecting),
            recoverable_value: dec!(150),
            origin_month_label: Some("Janeiro/2026".to_owned()),
            record_type: Some(RecordType::Original),
            ..EventRow::default()
        }
    }

    fn stored_january() -> Vec<MonthRecord> {
        vec![MonthRecord {
            rows: vec![january_claim()],
            ..MonthRecord::new(key(2026, 1), Utc::now())
        }]
    }

    /// February grid with the carried-over claim in row 0 and a blank slot.
    fn february_session() -> SessionContext {
        SessionContext::new(key(2026, 2), vec![january_claim(), EventRow::default()])
    }

    #[test]
    fn decision_table() {
        let mut row = january_claim();
        assert_eq!(check(&row, "Fevereiro/2026"), Err(SkipReason::NotClosed));

        row.status = Some(RowStatus::Finalized);
        assert_eq!(check(&row, "Fevereiro/2026"), Ok(()));
        assert_eq!(check(&row, "Janeiro/2026"), Err(SkipReason::SameMonth));

        row.finalization_month_label = Some("Março/2026".to_owned());
        assert_eq!(check(&row, "Fevereiro/2026"), Err(SkipReason::AlreadyFinalized));

        row.origin_month_label = None;
        assert_eq!(check(&row, "Fevereiro/2026"), Err(SkipReason::NoOrigin));
    }

    #[test]
    fn finalization_is_cost_neutral() {
        let stored = stored_january();
        let mut session = february_session();
        let mut gate = FixedGate::accept();

        let outcome =
            apply_status_change(&mut session, 0, RowStatus::Finalized, &stored, &mut gate).unwrap();

        assert_eq!(
            outcome,
            Some(FinalizeOutcome::Linked {
                row_index: 1,
                source_month: key(2026, 1),
                source_row: 0,
            })
        );
        let marker = &session.rows[1];
        assert!(marker.is_cost_free());
        assert_eq!(marker.total_cost(), dec!(0));
        assert_eq!(marker.status, Some(RowStatus::Finalized));
        assert_eq!(marker.record_type, Some(RecordType::Finalization));
        assert_eq!(marker.origin_label(), Some("Janeiro/2026"));
        assert_eq!(marker.finalization_month_label.as_deref(), Some("Fevereiro/2026"));
        assert_eq!(marker.plate, "ABC-1234");
        assert_eq!(marker.causer, Some(Causer::ThirdParty));
        assert_eq!(marker.recoverable_value, dec!(150));
        assert_eq!(marker.notes, "Finalizado em Fevereiro/2026 - Lançado em Janeiro/2026");

        // The January original is untouched.
        let original = &stored[0].rows[0];
        assert_eq!(original.labor, dec!(100));
        assert_eq!(original.parts, dec!(50));
        assert_eq!(original.total_cost(), dec!(150));
        assert_eq!(original.status, Some(RowStatus::InProgress));
    }

    #[test]
    fn finalization_is_single_shot() {
        let stored = stored_january();
        let mut session = february_session();
        let mut gate = FixedGate::accept();

        apply_status_change(&mut session, 0, RowStatus::Finalized, &stored, &mut gate).unwrap();
        let rows_after_first = session.rows.len();
        let second =
            apply_status_change(&mut session, 0, RowStatus::Finalized, &stored, &mut gate).unwrap();

        assert_eq!(second, Some(FinalizeOutcome::Skipped(SkipReason::AlreadyFinalized)));
        assert_eq!(session.rows.len(), rows_after_first);
        let markers = session
            .rows
            .iter()
            .filter(|r| r.record_type == Some(RecordType::Finalization))
            .count();
        assert_eq!(markers, 1);
    }

    #[test]
    fn confirmation_shows_original_costs() {
        let stored = stored_january();
        let mut session = february_session();
        let mut gate = ScriptedGate::new([false]);

        let outcome =
            apply_status_change(&mut session, 0, RowStatus::Denied, &stored, &mut gate).unwrap();

        assert_eq!(outcome, Some(FinalizeOutcome::Declined));
        assert!(gate.prompts()[0].contains("R$ 150,00"));
        assert!(gate.prompts()[0].contains("Janeiro/2026"));
        // Declining closes in place without linking.
        assert_eq!(session.rows[0].status, Some(RowStatus::Denied));
        assert!(session.rows[0].finalization_month_label.is_none());
        assert!(session.rows[1].is_blank());
    }

    #[test]
    fn missing_source_is_a_no_op() {
        let mut session = february_session();
        let mut gate = ScriptedGate::default();

        let outcome =
            apply_status_change(&mut session, 0, RowStatus::Finalized, &[], &mut gate).unwrap();

        assert_eq!(outcome, Some(FinalizeOutcome::SourceNotFound));
        assert!(gate.prompts().is_empty());
        assert_eq!(session.rows[0].status, Some(RowStatus::Finalized));
        assert!(session.rows[1].is_blank());
    }

    #[test]
    fn never_overwrites_filled_rows() {
        let stored = stored_january();
        let other = EventRow {
            association: "PM".to_owned(),
            plate: "QQQ0001".to_owned(),
            ..EventRow::default()
        };
        let mut session = SessionContext::new(key(2026, 2), vec![january_claim(), other.clone()]);

        let outcome = apply_status_change(
            &mut session,
            0,
            RowStatus::Finalized,
            &stored,
            &mut FixedGate::accept(),
        )
        .unwrap();

        assert!(matches!(outcome, Some(FinalizeOutcome::Linked { row_index: 2, .. })));
        assert_eq!(session.rows[1], other);
    }

    #[test]
    fn reopening_does_not_finalize() {
        let stored = stored_january();
        let mut session = february_session();
        let outcome = apply_status_change(
            &mut session,
            0,
            RowStatus::Pending,
            &stored,
            &mut FixedGate::accept(),
        )
        .unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn brl_uses_brazilian_separators() {
        assert_eq!(format_brl(dec!(150)), "R$ 150,00");
        assert_eq!(format_brl(dec!(1234.5)), "R$ 1.234,50");
        assert_eq!(format_brl(dec!(1234567.891)), "R$ 1.234.567,89");
        assert_eq!(format_brl(dec!(0.005)), "R$ 0,01");
        assert_eq!(format_brl(dec!(-42.1)), "-R$ 42,10");
        assert_eq!(format_brl(dec!(-0.001)), "R$ 0,00");
    }
}
