//! # Compliance Events
//!
//! Every externally visible state change produces a [`ComplianceEvent`].
//! Pure transition functions return events alongside the next state; the
//! caller persists the state and hands the events to the notification
//! dispatcher.
//!
//! The event type is derived from the payload variant. Subscriptions hold
//! an [`EventTypeSet`] and receive an event when the set contains its type.

use chrono::NaiveDate;
use csc_core::{
    EventId, Flag, FlagSet, LicenceId, ReclassificationId, SubstanceCode, Timestamp,
    TransactionId,
};
use serde::{Deserialize, Serialize};

use crate::licence::{HolderRef, LicenceStatus};
use crate::substance::Classification;
use crate::transaction::{OverrideStatus, Transaction, ValidationStatus};
use crate::violation::ThresholdContext;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Named event category, as carried in the `eventType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Validation passed.
    #[serde(rename = "transaction.passed")]
    TransactionPassed,
    /// Validation failed with blocking violations.
    #[serde(rename = "transaction.blocked")]
    TransactionBlocked,
    /// A blocked transaction awaits an override decision.
    #[serde(rename = "override.requested")]
    OverrideRequested,
    /// An override was approved.
    #[serde(rename = "override.approved")]
    OverrideApproved,
    /// An override was rejected.
    #[serde(rename = "override.rejected")]
    OverrideRejected,
    /// A threshold warning level was reached.
    #[serde(rename = "threshold.warning")]
    ThresholdWarning,
    /// A licence was suspended.
    #[serde(rename = "licence.suspended")]
    LicenceSuspended,
    /// A suspended licence was reinstated.
    #[serde(rename = "licence.reinstated")]
    LicenceReinstated,
    /// A licence was revoked.
    #[serde(rename = "licence.revoked")]
    LicenceRevoked,
    /// A licence was renewed with a new expiry.
    #[serde(rename = "licence.renewed")]
    LicenceRenewed,
    /// A licence was marked expired.
    #[serde(rename = "licence.expired")]
    LicenceExpired,
    /// A substance reclassification completed.
    #[serde(rename = "substance.reclassified")]
    SubstanceReclassified,
}

impl Flag for EventType {
    const KIND: &'static str = "event type";
    const ALL: &'static [Self] = &[
        Self::TransactionPassed,
        Self::TransactionBlocked,
        Self::OverrideRequested,
        Self::OverrideApproved,
        Self::OverrideRejected,
        Self::ThresholdWarning,
        Self::LicenceSuspended,
        Self::LicenceReinstated,
        Self::LicenceRevoked,
        Self::LicenceRenewed,
        Self::LicenceExpired,
        Self::SubstanceReclassified,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::TransactionPassed => "transaction.passed",
            Self::TransactionBlocked => "transaction.blocked",
            Self::OverrideRequested => "override.requested",
            Self::OverrideApproved => "override.approved",
            Self::OverrideRejected => "override.rejected",
            Self::ThresholdWarning => "threshold.warning",
            Self::LicenceSuspended => "licence.suspended",
            Self::LicenceReinstated => "licence.reinstated",
            Self::LicenceRevoked => "licence.revoked",
            Self::LicenceRenewed => "licence.renewed",
            Self::LicenceExpired => "licence.expired",
            Self::SubstanceReclassified => "substance.reclassified",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Flag::as_str(*self))
    }
}

/// Set of event types a subscription listens for.
pub type EventTypeSet = FlagSet<EventType>;

// ---------------------------------------------------------------------------
// Payload data
// ---------------------------------------------------------------------------

/// Snapshot of a transaction's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// Transaction identifier.
    pub transaction_id: TransactionId,
    /// Reference in the submitting system.
    pub external_reference: String,
    /// Calendar date the transaction was judged on.
    pub transaction_date: NaiveDate,
    /// Overall status.
    pub status: ValidationStatus,
    /// Override workflow state.
    pub override_status: OverrideStatus,
    /// Codes of all violations, in order.
    pub violation_codes: Vec<String>,
    /// Whether an override can clear the block.
    pub override_eligible: bool,
}

impl TransactionSummary {
    /// Summarize a validated transaction.
    pub fn of(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            external_reference: tx.external_reference.clone(),
            transaction_date: tx.transaction_date,
            status: tx.status(),
            override_status: tx.override_status,
            violation_codes: tx.violations.iter().map(|v| v.code.clone()).collect(),
            override_eligible: tx.is_overridable(),
        }
    }
}

/// An override decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideDecided {
    /// Transaction identifier.
    pub transaction_id: TransactionId,
    /// Reference in the submitting system.
    pub external_reference: String,
    /// Approver or rejecter.
    pub actor: String,
    /// Justification or reason.
    pub justification: String,
    /// Decision time.
    pub decided_at: Timestamp,
    /// Resulting overall status.
    pub status: ValidationStatus,
}

/// A threshold warning on a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdWarningRaised {
    /// Transaction identifier.
    pub transaction_id: TransactionId,
    /// Line, for per-line rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    /// Evaluation context.
    pub threshold: ThresholdContext,
}

/// A licence lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenceChange {
    /// Licence identifier.
    pub licence_id: LicenceId,
    /// Holder.
    pub holder: HolderRef,
    /// Status before.
    pub previous_status: LicenceStatus,
    /// Status after.
    pub new_status: LicenceStatus,
    /// Expiry after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    /// Stated reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A completed reclassification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstanceReclassified {
    /// Substance.
    pub substance_code: SubstanceCode,
    /// Reclassification event.
    pub reclassification_id: ReclassificationId,
    /// Classification before.
    pub previous: Classification,
    /// Classification after.
    pub new: Classification,
    /// First day of the new classification.
    pub effective_date: NaiveDate,
}

/// Event payload; the variant determines the event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data")]
pub enum EventPayload {
    /// See [`EventType::TransactionPassed`].
    #[serde(rename = "transaction.passed")]
    TransactionPassed(TransactionSummary),
    /// See [`EventType::TransactionBlocked`].
    #[serde(rename = "transaction.blocked")]
    TransactionBlocked(TransactionSummary),
    /// See [`EventType::OverrideRequested`].
    #[serde(rename = "override.requested")]
    OverrideRequested(TransactionSummary),
    /// See [`EventType::OverrideApproved`].
    #[serde(rename = "override.approved")]
    OverrideApproved(OverrideDecided),
    /// See [`EventType::OverrideRejected`].
    #[serde(rename = "override.rejected")]
    OverrideRejected(OverrideDecided),
    /// See [`EventType::ThresholdWarning`].
    #[serde(rename = "threshold.warning")]
    ThresholdWarning(ThresholdWarningRaised),
    /// See [`EventType::LicenceSuspended`].
    #[serde(rename = "licence.suspended")]
    LicenceSuspended(LicenceChange),
    /// See [`EventType::LicenceReinstated`].
    #[serde(rename = "licence.reinstated")]
    LicenceReinstated(LicenceChange),
    /// See [`EventType::LicenceRevoked`].
    #[serde(rename = "licence.revoked")]
    LicenceRevoked(LicenceChange),
    /// See [`EventType::LicenceRenewed`].
    #[serde(rename = "licence.renewed")]
    LicenceRenewed(LicenceChange),
    /// See [`EventType::LicenceExpired`].
    #[serde(rename = "licence.expired")]
    LicenceExpired(LicenceChange),
    /// See [`EventType::SubstanceReclassified`].
    #[serde(rename = "substance.reclassified")]
    SubstanceReclassified(SubstanceReclassified),
}

impl EventPayload {
    /// The event type this payload is published under.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::TransactionPassed(_) => EventType::TransactionPassed,
            Self::TransactionBlocked(_) => EventType::TransactionBlocked,
            Self::OverrideRequested(_) => EventType::OverrideRequested,
            Self::OverrideApproved(_) => EventType::OverrideApproved,
            Self::OverrideRejected(_) => EventType::OverrideRejected,
            Self::ThresholdWarning(_) => EventType::ThresholdWarning,
            Self::LicenceSuspended(_) => EventType::LicenceSuspended,
            Self::LicenceReinstated(_) => EventType::LicenceReinstated,
            Self::LicenceRevoked(_) => EventType::LicenceRevoked,
            Self::LicenceRenewed(_) => EventType::LicenceRenewed,
            Self::LicenceExpired(_) => EventType::LicenceExpired,
            Self::SubstanceReclassified(_) => EventType::SubstanceReclassified,
        }
    }

    /// The event-specific `data` object.
    pub fn data(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::TransactionPassed(d) | Self::TransactionBlocked(d) | Self::OverrideRequested(d) => {
                serde_json::to_value(d)
            }
            Self::OverrideApproved(d) | Self::OverrideRejected(d) => serde_json::to_value(d),
            Self::ThresholdWarning(d) => serde_json::to_value(d),
            Self::LicenceSuspended(d)
            | Self::LicenceReinstated(d)
            | Self::LicenceRevoked(d)
            | Self::LicenceRenewed(d)
            | Self::LicenceExpired(d) => serde_json::to_value(d),
            Self::SubstanceReclassified(d) => serde_json::to_value(d),
        }
    }
}

/// A state-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceEvent {
    /// Unique event identifier.
    pub event_id: EventId,
    /// When the change happened.
    pub occurred_at: Timestamp,
    /// What happened.
    pub payload: EventPayload,
}

impl ComplianceEvent {
    /// Stamp a payload with a fresh identifier.
    pub fn new(payload: EventPayload, occurred_at: Timestamp) -> Self {
        Self {
            event_id: EventId::new(),
            occurred_at,
            payload,
        }
    }

    /// The event type.
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}
