//! # Reclassification Lifecycle
//!
//! Regulators announce a reclassification ahead of its effective date.
//! It is recorded as `Pending`, and only once `Completed` does it take part
//! in as-of classification resolution. Completion also moves the
//! substance's current classification to the latest completed event.
//!
//! The substance may never be reclassified to none on both axes.

use chrono::NaiveDate;
use csc_core::{ReclassificationId, Timestamp};
use csc_registry::{
    Classification, ComplianceEvent, EventPayload, ReclassificationEvent, ReclassificationStatus,
    Substance, SubstanceReclassified,
};

use crate::error::ReclassificationError;

/// Record a pending reclassification from the current classification to `new`.
///
/// # Errors
///
/// [`ReclassificationError::WouldDecontrol`] if `new` is none on both axes,
/// [`ReclassificationError::Unchanged`] if it equals the current classification.
pub fn schedule_reclassification(
    mut substance: Substance,
    new: Classification,
    effective_date: NaiveDate,
    regulatory_reference: Option<String>,
) -> Result<(Substance, ReclassificationId), ReclassificationError> {
    if !new.is_controlled() {
        return Err(ReclassificationError::WouldDecontrol(substance.code.clone()));
    }
    if new == substance.classification {
        return Err(ReclassificationError::Unchanged(substance.code.clone()));
    }
    let id = ReclassificationId::new();
    substance.reclassifications.push(ReclassificationEvent {
        id,
        previous: substance.classification,
        new,
        effective_date,
        status: ReclassificationStatus::Pending,
        regulatory_reference,
    });
    tracing::debug!(substance = %substance.code, %id, %effective_date, %new, "reclassification scheduled");
    Ok((substance, id))
}

/// Complete a pending reclassification.
///
/// # Errors
///
/// [`ReclassificationError::UnknownEvent`] or [`ReclassificationError::NotPending`].
pub fn complete_reclassification(
    mut substance: Substance,
    id: ReclassificationId,
    at: Timestamp,
) -> Result<(Substance, ComplianceEvent), ReclassificationError> {
    let event = pending_event(&mut substance, id)?;
    event.status = ReclassificationStatus::Completed;
    let (previous, new, effective_date) = (event.previous, event.new, event.effective_date);
    let payload = SubstanceReclassified {
        substance_code: substance.code.clone(),
        reclassification_id: id,
        previous,
        new,
        effective_date,
    };

    if let Some((_, latest)) = substance
        .completed_reclassifications()
        .max_by_key(|(position, e)| (e.effective_date, *position))
    {
        substance.classification = latest.new;
    }
    tracing::info!(
        substance = %substance.code,
        %id,
        previous = %payload.previous,
        new = %payload.new,
        effective_date = %payload.effective_date,
        "reclassification completed"
    );
    Ok((
        substance,
        ComplianceEvent::new(EventPayload::SubstanceReclassified(payload), at),
    ))
}

/// Withdraw a pending reclassification. No event is published.
///
/// # Errors
///
/// [`ReclassificationError::UnknownEvent`] or [`ReclassificationError::NotPending`].
pub fn cancel_reclassification(
    mut substance: Substance,
    id: ReclassificationId,
) -> Result<Substance, ReclassificationError> {
    pending_event(&mut substance, id)?.status = ReclassificationStatus::Cancelled;
    tracing::debug!(substance = %substance.code, %id, "reclassification cancelled");
    Ok(substance)
}

fn pending_event(
    substance: &mut Substance,
    id: ReclassificationId,
) -> Result<&mut ReclassificationEvent, ReclassificationError> {
    let code = substance.code.clone();
    let event = substance
        .reclassifications
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or(ReclassificationError::UnknownEvent { code, id })?;
    if event.status != ReclassificationStatus::Pending {
        return Err(ReclassificationError::NotPending {
            id,
            status: event.status,
        });
    }
    Ok(event)
}
