//! Errors raised by invalid transitions.
//!
//! These signal misuse of the workflow API, not compliance findings, and
//! are returned immediately.

use chrono::NaiveDate;
use csc_core::{LicenceId, ReclassificationId, SubstanceCode, TransactionId};
use csc_registry::{LicenceStatus, OverrideStatus, ReclassificationStatus};
use thiserror::Error;

/// Errors from the override workflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverrideError {
    /// The transaction is not awaiting an override decision.
    #[error("transaction {id} does not require an override (override status {status})")]
    NotPending {
        /// Transaction identifier.
        id: TransactionId,
        /// Current override status.
        status: OverrideStatus,
    },

    /// The deciding actor is blank.
    #[error("override decision for transaction {0} names no actor")]
    MissingActor(TransactionId),

    /// The justification or reason is blank.
    #[error("override decision for transaction {0} carries no justification")]
    MissingJustification(TransactionId),
}

/// Errors from licence lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LicenceError {
    /// The transition is not allowed from the current status.
    #[error("licence {licence_id}: cannot {action} a {status} licence")]
    InvalidTransition {
        /// Licence identifier.
        licence_id: LicenceId,
        /// Attempted transition.
        action: &'static str,
        /// Current status.
        status: LicenceStatus,
    },

    /// Renewal must move the expiry date forward.
    #[error("licence {licence_id}: new expiry {new_expiry} is not after {current}")]
    ExpiryNotExtended {
        /// Licence identifier.
        licence_id: LicenceId,
        /// Requested expiry.
        new_expiry: NaiveDate,
        /// Current expiry, or the issue date for open-ended licences.
        current: NaiveDate,
    },

    /// Expiring a licence that is still effectively valid.
    #[error("licence {licence_id} is still valid on {as_of}")]
    NotYetExpired {
        /// Licence identifier.
        licence_id: LicenceId,
        /// Date checked.
        as_of: NaiveDate,
    },

    /// Reason text is blank.
    #[error("licence {0}: a reason is required")]
    MissingReason(LicenceId),
}

/// Errors from reclassification transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReclassificationError {
    /// The substance has no reclassification with this identifier.
    #[error("substance {code} has no reclassification {id}")]
    UnknownEvent {
        /// Substance.
        code: SubstanceCode,
        /// Requested event.
        id: ReclassificationId,
    },

    /// Only pending reclassifications can be completed or cancelled.
    #[error("reclassification {id} is {status}, not pending")]
    NotPending {
        /// Event identifier.
        id: ReclassificationId,
        /// Current status.
        status: ReclassificationStatus,
    },

    /// The new classification is none on both axes.
    #[error("reclassification of {0} would leave it uncontrolled on both axes")]
    WouldDecontrol(SubstanceCode),

    /// The new classification equals the current one.
    #[error("substance {0} already has this classification")]
    Unchanged(SubstanceCode),
}
