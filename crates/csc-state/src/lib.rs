//! # csc-state — Compliance State Transitions
//!
//! Pure transition functions: each takes the current record by value and
//! returns the next record plus the [`ComplianceEvent`](csc_registry::ComplianceEvent)
//! to publish. Nothing here persists or notifies; the caller saves the
//! returned state and hands the event to the dispatcher.
//!
//! ## State Machines
//!
//! - **Override** ([`override_workflow`]):
//!   `None → Pending → Approved | Rejected`. Both decisions are terminal for
//!   the cycle; a new cycle needs re-validation.
//!
//! - **Licence** ([`licence`]):
//!   `Valid ⇄ Suspended`, `Valid → Expired → Valid (renewal)`, anything
//!   but `Revoked` `→ Revoked` (terminal).
//!
//! - **Reclassification** ([`reclassification`]):
//!   `Pending → Completed | Cancelled`. Completion is what makes an event
//!   participate in as-of classification resolution.

pub mod error;
pub mod licence;
pub mod override_workflow;
pub mod reclassification;

pub use error::{LicenceError, OverrideError, ReclassificationError};
pub use licence::{expire, reinstate, renew, revoke, suspend};
pub use override_workflow::{approve_override, reject_override};
pub use reclassification::{cancel_reclassification, complete_reclassification, schedule_reclassification};
