//! Override approval with the threshold ceiling check.
//!
//! A breach above its rule's hard ceiling can never be approved, whatever
//! the human decision. The override workflow itself trusts the validator's
//! eligibility flags, so approvals go through [`OverrideGate`] which checks
//! every breach first. Rejections need no check.

use csc_core::Timestamp;
use csc_registry::{ComplianceEvent, Transaction, ThresholdContext, ViolationDetail};
use csc_state::{approve_override, reject_override};

use crate::error::OverrideGateError;

/// Entry point for override decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideGate;

impl OverrideGate {
    /// Refuse if any threshold breach on `tx` is above its override ceiling.
    ///
    /// # Errors
    ///
    /// [`OverrideGateError::CeilingExceeded`] naming the first such breach.
    pub fn check_ceilings(tx: &Transaction) -> Result<(), OverrideGateError> {
        let over = tx.violations.iter().find_map(|v| match &v.detail {
            ViolationDetail::ThresholdExceeded(ctx) if ctx.exceeds_override_ceiling() => Some(ctx),
            _ => None,
        });
        match over {
            Some(ThresholdContext {
                rule_id,
                value,
                override_ceiling: Some(ceiling),
                ..
            }) => Err(OverrideGateError::CeilingExceeded {
                rule_id: rule_id.clone(),
                value: *value,
                ceiling: *ceiling,
            }),
            _ => Ok(()),
        }
    }

    /// Approve a pending override after the ceiling check.
    ///
    /// # Errors
    ///
    /// [`OverrideGateError::CeilingExceeded`], or the workflow's refusal.
    pub fn approve(
        &self,
        tx: Transaction,
        approver: &str,
        justification: &str,
        at: Timestamp,
    ) -> Result<(Transaction, ComplianceEvent), OverrideGateError> {
        if let Err(err) = Self::check_ceilings(&tx) {
            tracing::warn!(transaction = %tx.id, error = %err, "override approval refused");
            return Err(err);
        }
        Ok(approve_override(tx, approver, justification, at)?)
    }

    /// Reject a pending override.
    ///
    /// # Errors
    ///
    /// The workflow's refusal.
    pub fn reject(
        &self,
        tx: Transaction,
        rejecter: &str,
        reason: &str,
        at: Timestamp,
    ) -> Result<(Transaction, ComplianceEvent), OverrideGateError> {
        Ok(reject_override(tx, rejecter, reason, at)?)
    }
}
