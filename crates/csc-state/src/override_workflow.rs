//! # Override Workflow
//!
//! ```text
//! None ──(validation: every blocking violation eligible)──▶ Pending
//! Pending ──approve──▶ Approved   (status ApprovedWithOverride, terminal)
//! Pending ──reject───▶ Rejected   (status RejectedOverride, terminal)
//! ```
//!
//! The workflow trusts the validator's override-eligibility flags and does
//! not re-derive threshold ceilings; callers that need the ceiling check
//! go through the compliance crate's `OverrideGate`.

use csc_core::Timestamp;
use csc_registry::{
    ComplianceEvent, EventPayload, OverrideDecided, OverrideDecision, OverrideStatus, Transaction,
};

use crate::error::OverrideError;

/// Approve a pending override.
///
/// # Errors
///
/// [`OverrideError::NotPending`] unless the override is pending, and
/// [`OverrideError::MissingActor`] / [`OverrideError::MissingJustification`]
/// for blank inputs.
pub fn approve_override(
    tx: Transaction,
    approver: &str,
    justification: &str,
    at: Timestamp,
) -> Result<(Transaction, ComplianceEvent), OverrideError> {
    decide(tx, approver, justification, at, OverrideStatus::Approved)
}

/// Reject a pending override.
///
/// # Errors
///
/// Same as [`approve_override`].
pub fn reject_override(
    tx: Transaction,
    rejecter: &str,
    reason: &str,
    at: Timestamp,
) -> Result<(Transaction, ComplianceEvent), OverrideError> {
    decide(tx, rejecter, reason, at, OverrideStatus::Rejected)
}

fn decide(
    mut tx: Transaction,
    actor: &str,
    justification: &str,
    at: Timestamp,
    decision: OverrideStatus,
) -> Result<(Transaction, ComplianceEvent), OverrideError> {
    if !tx.requires_override() {
        return Err(OverrideError::NotPending {
            id: tx.id,
            status: tx.override_status,
        });
    }
    let actor = actor.trim();
    let justification = justification.trim();
    if actor.is_empty() {
        return Err(OverrideError::MissingActor(tx.id));
    }
    if justification.is_empty() {
        return Err(OverrideError::MissingJustification(tx.id));
    }

    tx.override_status = decision;
    tx.override_decision = Some(OverrideDecision {
        actor: actor.to_string(),
        justification: justification.to_string(),
        decided_at: at,
    });

    let decided = OverrideDecided {
        transaction_id: tx.id,
        external_reference: tx.external_reference.clone(),
        actor: actor.to_string(),
        justification: justification.to_string(),
        decided_at: at,
        status: tx.status(),
    };
    let payload = match decision {
        OverrideStatus::Rejected => EventPayload::OverrideRejected(decided),
        _ => EventPayload::OverrideApproved(decided),
    };
    tracing::info!(
        transaction = %tx.id,
        decision = %decision,
        actor,
        status = %tx.status(),
        "override decided"
    );
    Ok((tx, ComplianceEvent::new(payload, at)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use csc_core::{CountryCode, CustomerId, TransactionId};
    use csc_registry::{
        Direction, EventType, HolderRef, QualificationStatus, TransactionType, ValidationStatus,
        Violation, ViolationDetail,
    };

    fn blocked(status: OverrideStatus) -> Transaction {
        let date = chrono::NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
        Transaction {
            id: TransactionId::new(),
            external_reference: "SO-2002".to_string(),
            transaction_type: TransactionType::Order,
            direction: Direction::Outbound,
            holder: HolderRef::Company,
            customer_id: Some(CustomerId::new("C-9").unwrap()),
            origin_country: CountryCode::new("NL").unwrap(),
            destination_country: CountryCode::new("NL").unwrap(),
            transaction_date: date,
            permits: Vec::new(),
            lines: Vec::new(),
            violations: vec![Violation::new(
                None,
                ViolationDetail::CustomerIneligible {
                    customer_id: CustomerId::new("C-9").unwrap(),
                    qualification: QualificationStatus::Pending,
                },
                "customer C-9 is pending, not approved",
            )],
            validated_at: Some(Timestamp::now()),
            override_status: status,
            override_decision: None,
        }
    }

    #[test]
    fn approve_sets_status_and_emits_event() {
        let tx = blocked(OverrideStatus::Pending);
        assert_eq!(tx.status(), ValidationStatus::Failed);
        let at = Timestamp::now();
        let (tx, event) = approve_override(tx, " qp.jansen ", "Verified by phone", at).unwrap();
        assert_eq!(tx.status(), ValidationStatus::ApprovedWithOverride);
        assert_eq!(tx.override_status, OverrideStatus::Approved);
        let decision = tx.override_decision.as_ref().unwrap();
        assert_eq!(decision.actor, "qp.jansen");
        assert_eq!(decision.decided_at, at);
        assert_eq!(event.event_type(), EventType::OverrideApproved);
    }

    #[test]
    fn reject_sets_rejected_override() {
        let (tx, event) =
            reject_override(blocked(OverrideStatus::Pending), "qp.jansen", "No documentation", Timestamp::now())
                .unwrap();
        assert_eq!(tx.status(), ValidationStatus::RejectedOverride);
        assert_eq!(event.event_type(), EventType::OverrideRejected);
    }

    #[test]
    fn decisions_require_pending_override() {
        let err = approve_override(blocked(OverrideStatus::None), "a", "b", Timestamp::now()).unwrap_err();
        assert!(matches!(
            err,
            OverrideError::NotPending {
                status: OverrideStatus::None,
                ..
            }
        ));
        assert!(reject_override(blocked(OverrideStatus::None), "a", "b", Timestamp::now()).is_err());
    }

    #[test]
    fn decisions_are_terminal() {
        let (approved, _) =
            approve_override(blocked(OverrideStatus::Pending), "a", "b", Timestamp::now()).unwrap();
        assert!(approve_override(approved.clone(), "a", "b", Timestamp::now()).is_err());
        assert!(reject_override(approved, "a", "b", Timestamp::now()).is_err());

        let (rejected, _) =
            reject_override(blocked(OverrideStatus::Pending), "a", "b", Timestamp::now()).unwrap();
        assert!(matches!(
            approve_override(rejected, "a", "b", Timestamp::now()),
            Err(OverrideError::NotPending {
                status: OverrideStatus::Rejected,
                ..
            })
        ));
    }

    #[test]
    fn blank_inputs_are_refused() {
        let tx = blocked(OverrideStatus::Pending);
        assert!(matches!(
            approve_override(tx.clone(), "  ", "ok", Timestamp::now()),
            Err(OverrideError::MissingActor(_))
        ));
        assert!(matches!(
            reject_override(tx, "qp", "", Timestamp::now()),
            Err(OverrideError::MissingJustification(_))
        ));
    }
}
