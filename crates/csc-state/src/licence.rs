//! # Licence Lifecycle
//!
//! ```text
//! Valid ──suspend──▶ Suspended ──reinstate──▶ Valid
//! Valid ──expire───▶ Expired   ──renew──────▶ Valid
//! Valid | Suspended | Expired ──revoke──▶ Revoked (terminal)
//! ```
//!
//! Renewal also applies to a still-valid licence (extending its expiry).
//! Every transition returns the next licence and one `licence.*` event.

use chrono::NaiveDate;
use csc_core::Timestamp;
use csc_registry::{ComplianceEvent, EventPayload, Licence, LicenceChange, LicenceStatus, LicenceValidity};

use crate::error::LicenceError;

fn require_reason(licence: &Licence, reason: &str) -> Result<String, LicenceError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LicenceError::MissingReason(licence.id.clone()));
    }
    Ok(reason.to_string())
}

fn invalid(licence: &Licence, action: &'static str) -> LicenceError {
    LicenceError::InvalidTransition {
        licence_id: licence.id.clone(),
        action,
        status: licence.status,
    }
}

fn transition(
    mut licence: Licence,
    to: LicenceStatus,
    reason: Option<String>,
    at: Timestamp,
    payload: fn(LicenceChange) -> EventPayload,
) -> (Licence, ComplianceEvent) {
    let previous = licence.status;
    licence.status = to;
    tracing::info!(licence = %licence.id, from = %previous, to = %to, "licence status changed");
    let change = LicenceChange {
        licence_id: licence.id.clone(),
        holder: licence.holder.clone(),
        previous_status: previous,
        new_status: to,
        expiry_date: licence.expiry_date,
        reason,
    };
    (licence, ComplianceEvent::new(payload(change), at))
}

/// Suspend a valid licence.
///
/// # Errors
///
/// [`LicenceError::InvalidTransition`] unless the licence is `Valid`;
/// [`LicenceError::MissingReason`] for a blank reason.
pub fn suspend(licence: Licence, reason: &str, at: Timestamp) -> Result<(Licence, ComplianceEvent), LicenceError> {
    if licence.status != LicenceStatus::Valid {
        return Err(invalid(&licence, "suspend"));
    }
    let reason = require_reason(&licence, reason)?;
    Ok(transition(licence, LicenceStatus::Suspended, Some(reason), at, EventPayload::LicenceSuspended))
}

/// Lift a suspension.
///
/// # Errors
///
/// [`LicenceError::InvalidTransition`] unless the licence is `Suspended`.
pub fn reinstate(licence: Licence, at: Timestamp) -> Result<(Licence, ComplianceEvent), LicenceError> {
    if licence.status != LicenceStatus::Suspended {
        return Err(invalid(&licence, "reinstate"));
    }
    Ok(transition(licence, LicenceStatus::Valid, None, at, EventPayload::LicenceReinstated))
}

/// Permanently withdraw a licence.
///
/// # Errors
///
/// [`LicenceError::InvalidTransition`] for an already revoked licence;
/// [`LicenceError::MissingReason`] for a blank reason.
pub fn revoke(licence: Licence, reason: &str, at: Timestamp) -> Result<(Licence, ComplianceEvent), LicenceError> {
    if licence.status.is_terminal() {
        return Err(invalid(&licence, "revoke"));
    }
    let reason = require_reason(&licence, reason)?;
    Ok(transition(licence, LicenceStatus::Revoked, Some(reason), at, EventPayload::LicenceRevoked))
}

/// Extend a valid or expired licence to `new_expiry`. Any grace period is
/// cleared.
///
/// # Errors
///
/// [`LicenceError::InvalidTransition`] for suspended or revoked licences;
/// [`LicenceError::ExpiryNotExtended`] unless `new_expiry` is after the
/// current expiry (or issue date, for open-ended licences).
pub fn renew(
    mut licence: Licence,
    new_expiry: NaiveDate,
    at: Timestamp,
) -> Result<(Licence, ComplianceEvent), LicenceError> {
    if !matches!(licence.status, LicenceStatus::Valid | LicenceStatus::Expired) {
        return Err(invalid(&licence, "renew"));
    }
    let current = licence.expiry_date.unwrap_or(licence.issue_date);
    if new_expiry <= current {
        return Err(LicenceError::ExpiryNotExtended {
            licence_id: licence.id.clone(),
            new_expiry,
            current,
        });
    }
    licence.expiry_date = Some(new_expiry);
    licence.grace_period_end = None;
    Ok(transition(licence, LicenceStatus::Valid, None, at, EventPayload::LicenceRenewed))
}

/// Record that a valid licence has lapsed as of `as_of`.
///
/// # Errors
///
/// [`LicenceError::InvalidTransition`] unless the licence is `Valid`;
/// [`LicenceError::NotYetExpired`] while it is still valid or in grace on `as_of`.
pub fn expire(licence: Licence, as_of: NaiveDate, at: Timestamp) -> Result<(Licence, ComplianceEvent), LicenceError> {
    if licence.status != LicenceStatus::Valid {
        return Err(invalid(&licence, "expire"));
    }
    if licence.validity_on(as_of) != LicenceValidity::Expired {
        return Err(LicenceError::NotYetExpired {
            licence_id: licence.id.clone(),
            as_of,
        });
    }
    Ok(transition(licence, LicenceStatus::Expired, None, at, EventPayload::LicenceExpired))
}
