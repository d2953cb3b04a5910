//! # Transactions
//!
//! A transaction is submitted by an external system and carries ordered
//! lines, each naming a product that the engine resolves to a substance.
//! The validator fills in each line's classification and coverage outcome
//! and the transaction's violation list; the override workflow records the
//! human decision.
//!
//! ## Status
//!
//! [`Transaction::status`] is computed, never stored:
//!
//! ```text
//!   not yet validated                 → Pending
//!   override approved                 → ApprovedWithOverride
//!   override rejected                 → RejectedOverride
//!   validated, no blocking violation  → Passed
//!   validated, blocking violation(s)  → Failed
//! ```
//!
//! Passed, ApprovedWithOverride and RejectedOverride are final.

use chrono::NaiveDate;
use csc_core::{CountryCode, CustomerId, LicenceId, SubstanceCode, Timestamp, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::licence::HolderRef;
use crate::substance::Classification;
use crate::violation::Violation;

/// Business type of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Customer order.
    Order,
    /// Physical shipment.
    Shipment,
    /// Goods returned by a customer.
    Return,
    /// Movement between own sites.
    Transfer,
}

/// Direction of goods flow relative to the holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Within the holder's own premises.
    Internal,
    /// Goods arriving.
    Inbound,
    /// Goods leaving.
    Outbound,
}

impl Direction {
    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized base unit of a line quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseUnit {
    /// Grams.
    #[serde(rename = "g")]
    Gram,
    /// Millilitres.
    #[serde(rename = "ml")]
    Millilitre,
    /// Discrete units (tablets, ampoules).
    #[serde(rename = "unit")]
    Unit,
}

/// Kind of transport permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitKind {
    /// Authorizes bringing goods in.
    Import,
    /// Authorizes sending goods out.
    Export,
}

impl PermitKind {
    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
        }
    }
}

impl std::fmt::Display for PermitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An import or export permit attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportPermit {
    /// Import or export.
    pub kind: PermitKind,
    /// Permit number.
    pub number: String,
    /// First valid day, if restricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<NaiveDate>,
    /// Last valid day.
    pub valid_until: NaiveDate,
}

impl TransportPermit {
    /// True if the permit is valid on `date`.
    pub fn valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from.map_or(true, |from| date >= from) && date <= self.valid_until
    }
}

/// Why no licence covers a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoCoverageReason {
    /// No candidate licence exists for the substance, activity and date.
    NoLicence,
    /// Candidates exist but failed only the expiry or grace-period check.
    Expired {
        /// The expired candidates.
        licence_ids: Vec<LicenceId>,
    },
    /// Candidates cover the line but every one lacks capacity.
    CapacityExceeded {
        /// The candidates that were disqualified.
        licence_ids: Vec<LicenceId>,
    },
}

/// Coverage outcome recorded on a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CoverageOutcome {
    /// The substance is not controlled on the transaction date.
    NotRequired,
    /// A licence covers the line.
    Covered {
        /// Covering licence.
        licence_id: LicenceId,
        /// True if valid only through its grace period.
        in_grace_period: bool,
        /// Quantity drawn from the licence.
        consumed: Decimal,
        /// Period capacity left after this line, if the mapping has a period cap.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remaining_in_period: Option<Decimal>,
    },
    /// No licence covers the line.
    NotCovered {
        /// Structured reason.
        reason: NoCoverageReason,
    },
}

fn default_true() -> bool {
    true
}

/// One line of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLine {
    /// Position within the transaction, starting at 1.
    pub line_number: u32,
    /// Product reference as supplied by the caller.
    pub product_ref: String,
    /// Quantity in `unit`.
    pub quantity: Decimal,
    /// Base unit.
    pub unit: BaseUnit,
    /// Declared monetary value, for value thresholds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_value: Option<Decimal>,
    /// Substance the product resolved to. `None` for uncontrolled products.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substance_code: Option<SubstanceCode>,
    /// Classification in force on the transaction date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Coverage outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageOutcome>,
    /// False if any blocking violation refers to this line.
    #[serde(default = "default_true")]
    pub is_valid: bool,
    /// Code of the first blocking violation on this line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl TransactionLine {
    /// A fresh, unvalidated line.
    pub fn new(line_number: u32, product_ref: impl Into<String>, quantity: Decimal, unit: BaseUnit) -> Self {
        Self {
            line_number,
            product_ref: product_ref.into(),
            quantity,
            unit,
            declared_value: None,
            substance_code: None,
            classification: None,
            coverage: None,
            is_valid: true,
            error_code: None,
        }
    }
}

/// Overall validation status. Always computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Not yet validated.
    Pending,
    /// No blocking violations.
    Passed,
    /// At least one blocking violation.
    Failed,
    /// Blocked, then cleared by an approved override.
    ApprovedWithOverride,
    /// Blocked, and the override was rejected.
    RejectedOverride,
}

impl ValidationStatus {
    /// True for states the validator must not leave.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Passed | Self::ApprovedWithOverride | Self::RejectedOverride
        )
    }

    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::ApprovedWithOverride => "approved_with_override",
            Self::RejectedOverride => "rejected_override",
        }
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Override workflow state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStatus {
    /// No override needed or possible.
    #[default]
    None,
    /// Awaiting a human decision.
    Pending,
    /// Approved (terminal).
    Approved,
    /// Rejected (terminal).
    Rejected,
}

impl OverrideStatus {
    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for OverrideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who decided an override, why, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideDecision {
    /// Approver or rejecter.
    pub actor: String,
    /// Justification or rejection reason.
    pub justification: String,
    /// Decision time.
    pub decided_at: Timestamp,
}

/// A submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier.
    #[serde(default)]
    pub id: TransactionId,
    /// Reference in the submitting system.
    pub external_reference: String,
    /// Business type.
    pub transaction_type: TransactionType,
    /// Direction of goods flow.
    pub direction: Direction,
    /// Licence holder performing the transaction.
    pub holder: HolderRef,
    /// Counterparty, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    /// Country goods leave from.
    pub origin_country: CountryCode,
    /// Country goods arrive in.
    pub destination_country: CountryCode,
    /// Calendar date the transaction is judged on.
    pub transaction_date: NaiveDate,
    /// Attached import/export permits.
    #[serde(default)]
    pub permits: Vec<TransportPermit>,
    /// Ordered lines.
    pub lines: Vec<TransactionLine>,
    /// Findings from the last validation.
    #[serde(default)]
    pub violations: Vec<Violation>,
    /// Time of the last validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<Timestamp>,
    /// Override workflow state.
    #[serde(default)]
    pub override_status: OverrideStatus,
    /// Recorded override decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_decision: Option<OverrideDecision>,
}

impl Transaction {
    /// Overall status, derived from violations and override state.
    pub fn status(&self) -> ValidationStatus {
        if self.validated_at.is_none() {
            return ValidationStatus::Pending;
        }
        match self.override_status {
            OverrideStatus::Approved => ValidationStatus::ApprovedWithOverride,
            OverrideStatus::Rejected => ValidationStatus::RejectedOverride,
            OverrideStatus::None | OverrideStatus::Pending => {
                if self.has_blocking_violations() {
                    ValidationStatus::Failed
                } else {
                    ValidationStatus::Passed
                }
            }
        }
    }

    /// True when origin and destination differ.
    pub fn is_cross_border(&self) -> bool {
        self.origin_country != self.destination_country
    }

    /// True if any violation blocks.
    pub fn has_blocking_violations(&self) -> bool {
        self.violations.iter().any(Violation::is_blocking)
    }

    /// Blocking (critical) violations.
    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_blocking())
    }

    /// Non-blocking violations.
    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.is_blocking())
    }

    /// True if there is at least one blocking violation and every blocking
    /// violation is override-eligible.
    pub fn is_overridable(&self) -> bool {
        let mut errors = self.errors().peekable();
        errors.peek().is_some() && errors.all(|v| v.override_eligible)
    }

    /// True while an override decision is awaited.
    pub fn requires_override(&self) -> bool {
        self.override_status == OverrideStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::ViolationDetail;

    fn transaction() -> Transaction {
        serde_json::from_value(serde_json::json!({
            "external_reference": "SO-1001",
            "transaction_type": "order",
            "direction": "outbound",
            "holder": "company",
            "customer_id": "C-1",
            "origin_country": "NL",
            "destination_country": "NL",
            "transaction_date": "2025-12-15",
            "lines": [
                {"line_number": 1, "product_ref": "SKU-MORPH-10", "quantity": "95", "unit": "g"}
            ]
        }))
        .unwrap()
    }

    fn ineligible(customer: &str) -> Violation {
        Violation::new(
            None,
            ViolationDetail::CustomerIneligible {
                customer_id: CustomerId::new(customer).unwrap(),
                qualification: crate::customer::QualificationStatus::Pending,
            },
            "customer not approved",
        )
    }

    #[test]
    fn unvalidated_transaction_is_pending() {
        let tx = transaction();
        assert_eq!(tx.status(), ValidationStatus::Pending);
        assert_eq!(tx.override_status, OverrideStatus::None);
        assert!(tx.lines[0].is_valid);
        assert!(!tx.is_cross_border());
    }

    #[test]
    fn status_follows_violations_and_override() {
        let mut tx = transaction();
        tx.validated_at = Some(Timestamp::now());
        assert_eq!(tx.status(), ValidationStatus::Passed);

        tx.violations.push(ineligible("C-1"));
        assert_eq!(tx.status(), ValidationStatus::Failed);
        assert!(tx.is_overridable());

        tx.override_status = OverrideStatus::Approved;
        assert_eq!(tx.status(), ValidationStatus::ApprovedWithOverride);
        tx.override_status = OverrideStatus::Rejected;
        assert_eq!(tx.status(), ValidationStatus::RejectedOverride);
        assert!(tx.status().is_final());
    }

    #[test]
    fn overridable_requires_every_blocking_violation_eligible() {
        let mut tx = transaction();
        assert!(!tx.is_overridable());
        tx.violations.push(ineligible("C-1"));
        tx.violations.push(ineligible("C-1").with_override_eligible(false));
        assert!(!tx.is_overridable());
    }

    #[test]
    fn permit_window_is_inclusive() {
        let permit = TransportPermit {
            kind: PermitKind::Export,
            number: "EX-1".to_string(),
            valid_from: Some(NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()),
            valid_until: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
        };
        assert!(permit.valid_on(NaiveDate::from_ymd_opt(2025, 12, 15).unwrap()));
        assert!(!permit.valid_on(NaiveDate::from_ymd_opt(2025, 12, 16).unwrap()));
        assert!(!permit.valid_on(NaiveDate::from_ymd_opt(2025, 11, 30).unwrap()));
    }

    #[test]
    fn coverage_outcome_wire_format() {
        let outcome = CoverageOutcome::NotCovered {
            reason: NoCoverageReason::Expired {
                licence_ids: vec![LicenceId::new("OW-1").unwrap()],
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "not_covered");
        assert_eq!(json["reason"]["kind"], "expired");
        assert_eq!(json["reason"]["licence_ids"][0], "OW-1");
        let back: CoverageOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }
}
