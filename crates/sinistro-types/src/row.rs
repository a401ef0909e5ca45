//! Incident rows and their closed vocabularies.
//!
//! An [`EventRow`] is one insurance incident as entered in a monthly
//! ledger. Older ledgers stored rows as 21 positional cells; this crate
//! names every field and versions the layout through
//! [`MonthRecord::schema_version`](crate::MonthRecord::schema_version).
//!
//! Vocabulary values serialize as the Portuguese labels the operators
//! type and read (`"EM ANDAMENTO"`, `"FINALIZAÇÃO"`, ...).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::plate::normalize_plate;

/// Generates a closed vocabulary enum with its wire label.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $label:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The label stored on the wire and shown to operators.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// Parse an operator-entered label, ignoring case and
            /// surrounding whitespace.
            pub fn from_label(raw: &str) -> Option<Self> {
                let wanted = raw.trim().to_uppercase();
                Self::ALL.iter().copied().find(|v| v.as_str() == wanted)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_enum! {
    /// Kind of incident.
    EventType {
        /// Broken glass (windshield, windows, mirrors).
        Glass => "VIDROS",
        /// Theft or robbery.
        Theft => "ROUBO/FURTO",
        /// Collision.
        Collision => "COLISÃO",
        /// Anything else.
        Other => "OUTROS",
    }
}

labelled_enum! {
    /// Lifecycle status of an incident.
    ///
    /// `EM ANDAMENTO`, `PENDENTE` and `ACORDO` are open; the rest are
    /// terminal.
    RowStatus {
        /// Work in progress at the workshop.
        InProgress => "EM ANDAMENTO",
        /// Waiting on documents or approval.
        Pending => "PENDENTE",
        /// Settlement negotiated, payment outstanding.
        Agreement => "ACORDO",
        /// Closed and paid.
        Finalized => "FINALIZADO",
        /// Claim denied.
        Denied => "NEGADO",
        /// Closed without charging the responsible party.
        DoNotCharge => "NÃO COBRAR",
    }
}

impl RowStatus {
    /// Whether the incident is still active.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::InProgress | Self::Pending | Self::Agreement)
    }

    /// Whether the status is terminal.
    pub const fn is_closed(self) -> bool {
        !self.is_open()
    }
}

labelled_enum! {
    /// Who caused the incident.
    Causer {
        /// The association member.
        Member => "ASSOCIADO",
        /// A third party, potentially liable for recovery.
        ThirdParty => "TERCEIRO",
        /// Unknown.
        Unidentified => "NÃO IDENTIFICADO",
    }
}

labelled_enum! {
    /// State of legal cost recovery against a third party.
    LegalStatus {
        /// Not sent to the legal team.
        NotStarted => "NÃO INICIADO",
        /// Collection in progress.
        Collecting => "EM COBRANÇA",
        /// Charged, awaiting payment.
        Charged => "COBRADO",
        /// Settlement agreed.
        Settlement => "ACORDO",
        /// Decided not to pursue.
        DoNotCharge => "NÃO COBRAR",
        /// Value recovered.
        Recovered => "RECUPERADO",
    }
}

labelled_enum! {
    /// Whether a row is the cost-bearing record or a closure marker.
    RecordType {
        /// The row of record, carrying the incident's costs.
        Original => "ORIGINAL",
        /// Zero-cost marker created when an incident is closed in a later month.
        Finalization => "FINALIZAÇÃO",
    }
}

/// One incident in a monthly ledger.
///
/// The association name is the primary field: a row whose association is
/// blank is an unused grid slot and is ignored by every check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct EventRow {
    /// Association the beneficiary belongs to (primary field).
    pub association: String,
    /// Beneficiary name.
    pub beneficiary: String,
    /// Kind of incident.
    pub event_type: Option<EventType>,
    /// Vehicle description.
    pub vehicle: String,
    /// Plate as typed; compare through [`EventRow::normalized_plate`].
    pub plate: String,
    /// Date the vehicle entered the workshop.
    pub workshop_date: Option<NaiveDate>,
    /// Workshop name.
    pub workshop: String,
    /// Member's share (deductible).
    #[ts(as = "String")]
    pub quota: Decimal,
    /// Labor cost.
    #[ts(as = "String")]
    pub labor: Decimal,
    /// Parts cost.
    #[ts(as = "String")]
    pub parts: Decimal,
    /// Other expenses.
    #[ts(as = "String")]
    pub other_costs: Decimal,
    /// Lifecycle status.
    pub status: Option<RowStatus>,
    /// Who caused the incident.
    pub causer: Option<Causer>,
    /// Legal recovery state.
    pub legal_status: Option<LegalStatus>,
    /// Date the case was sent to the legal team.
    pub legal_submission_date: Option<NaiveDate>,
    /// Value to recover from a liable third party.
    #[ts(as = "String")]
    pub recoverable_value: Decimal,
    /// Free-text notes.
    pub notes: String,
    /// Label of the month the row was first entered in. Write-once.
    pub origin_month_label: Option<String>,
    /// Label of the month the row was closed in, when that differs from
    /// the origin. Write-once.
    pub finalization_month_label: Option<String>,
    /// System-assigned record type.
    pub record_type: Option<RecordType>,
}

impl EventRow {
    /// Whether this is an unused grid slot (blank primary field).
    pub fn is_blank(&self) -> bool {
        self.association.trim().is_empty()
    }

    /// The plate canonicalized for comparison.
    pub fn normalized_plate(&self) -> String {
        normalize_plate(&self.plate)
    }

    /// Whether the row is filled in and its status is open.
    pub fn is_open(&self) -> bool {
        !self.is_blank() && self.status.is_some_and(RowStatus::is_open)
    }

    /// Sum of the four cost fields. Read-only, never stored.
    pub fn total_cost(&self) -> Decimal {
        self.quota
            .saturating_add(self.labor)
            .saturating_add(self.parts)
            .saturating_add(self.other_costs)
    }

    /// Whether all four cost fields are zero.
    pub fn is_cost_free(&self) -> bool {
        self.quota.is_zero()
            && self.labor.is_zero()
            && self.parts.is_zero()
            && self.other_costs.is_zero()
    }

    /// Whether any cost field is negative.
    pub fn has_negative_cost(&self) -> bool {
        [self.quota, self.labor, self.parts, self.other_costs]
            .iter()
            .any(Decimal::is_sign_negative)
    }

    /// Stamp the origin month on first fill. No-op once set.
    ///
    /// Returns `true` when the label was written.
    pub fn stamp_origin(&mut self, month_label: &str) -> bool {
        if self.is_blank() || has_text(self.origin_month_label.as_deref()) {
            return false;
        }
        self.origin_month_label = Some(month_label.to_owned());
        if self.record_type.is_none() {
            self.record_type = Some(RecordType::Original);
        }
        true
    }

    /// Record the month the row was closed in. No-op once set.
    ///
    /// Returns `true` when the label was written.
    pub fn mark_finalized_in(&mut self, month_label: &str) -> bool {
        if has_text(self.finalization_month_label.as_deref()) {
            return false;
        }
        self.finalization_month_label = Some(month_label.to_owned());
        true
    }

    /// The origin label, if set and non-blank.
    pub fn origin_label(&self) -> Option<&str> {
        self.origin_month_label
            .as_deref()
            .filter(|label| !label.trim().is_empty())
    }

    /// Whether a finalization month has already been recorded.
    pub fn is_finalized_elsewhere(&self) -> bool {
        has_text(self.finalization_month_label.as_deref())
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn filled(plate: &str, status: RowStatus) -> EventRow {
        EventRow {
            association: "PORTO MAIS".to_owned(),
            plate: plate.to_owned(),
            status: Some(status),
            ..EventRow::default()
        }
    }

    #[test]
    fn open_statuses() {
        assert!(RowStatus::InProgress.is_open());
        assert!(RowStatus::Pending.is_open());
        assert!(RowStatus::Agreement.is_open());
        assert!(RowStatus::Finalized.is_closed());
        assert!(RowStatus::Denied.is_closed());
        assert!(RowStatus::DoNotCharge.is_closed());
    }

    #[test]
    fn labels_parse_loosely() {
        assert_eq!(RowStatus::from_label(" em andamento "), Some(RowStatus::InProgress));
        assert_eq!(RowStatus::from_label("FINALIZADO"), Some(RowStatus::Finalized));
        assert_eq!(RowStatus::from_label("ARQUIVADO"), None);
        assert_eq!(RecordType::from_label("finalização"), Some(RecordType::Finalization));
    }

    #[test]
    fn vocabulary_serializes_as_labels() {
        let json = serde_json::to_string(&LegalStatus::Collecting).unwrap();
        assert_eq!(json, "\"EM COBRANÇA\"");
        let parsed: Causer = serde_json::from_str("\"NÃO IDENTIFICADO\"").unwrap();
        assert_eq!(parsed, Causer::Unidentified);
    }

    #[test]
    fn total_cost_sums_four_fields() {
        let row = EventRow {
            quota: dec!(10),
            labor: dec!(100),
            parts: dec!(50),
            other_costs: dec!(2.5),
            ..EventRow::default()
        };
        assert_eq!(row.total_cost(), dec!(162.5));
        assert!(!row.is_cost_free());
    }

    #[test]
    fn blank_row_is_never_open() {
        let mut row = filled("ABC1234", RowStatus::Pending);
        assert!(row.is_open());
        row.association = "   ".to_owned();
        assert!(!row.is_open());
    }

    #[test]
    fn origin_is_write_once() {
        let mut row = filled("ABC1234", RowStatus::Pending);
        assert!(row.stamp_origin("Janeiro/2026"));
        assert_eq!(row.record_type, Some(RecordType::Original));
        assert!(!row.stamp_origin("Fevereiro/2026"));
        assert_eq!(row.origin_label(), Some("Janeiro/2026"));
    }

    #[test]
    fn blank_row_gets_no_origin() {
        let mut row = EventRow::default();
        assert!(!row.stamp_origin("Janeiro/2026"));
        assert!(row.origin_month_label.is_none());
    }

    #[test]
    fn finalization_label_is_write_once() {
        let mut row = filled("ABC1234", RowStatus::Finalized);
        assert!(row.mark_finalized_in("Março/2026"));
        assert!(!row.mark_finalized_in("Abril/2026"));
        assert_eq!(row.finalization_month_label.as_deref(), Some("Março/2026"));
    }

    #[test]
    fn partial_row_decodes_with_defaults() {
        let json = r#"{"association": "PM", "plate": "abc-1234", "labor": "100"}"#;
        let row: EventRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.normalized_plate(), "ABC1234");
        assert_eq!(row.labor, dec!(100));
        assert!(row.status.is_none());
    }

    #[test]
    fn negative_cost_is_detected() {
        let row = EventRow {
            parts: dec!(-1),
            ..EventRow::default()
        };
        assert!(row.has_negative_cost());
    }
}
