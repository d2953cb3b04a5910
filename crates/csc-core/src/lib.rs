#![deny(missing_docs)]

//! # csc-core — Foundational Types for the Controlled Substance Compliance Stack
//!
//! This crate defines the primitives every other crate in the workspace
//! depends on. It has no internal crate dependencies; its external ones are
//! `serde`, `serde_json`, `serde_jcs`, `thiserror`, `chrono` and `uuid`.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain identifiers.** A [`LicenceId`] cannot be
//!    passed where a [`SubstanceCode`] is expected. String identifiers are
//!    validated at construction and at deserialization.
//!
//! 2. **[`CanonicalBytes`] is the sole path to signed payloads.** Webhook
//!    signatures are computed over RFC 8785 canonical JSON so that sender
//!    and receiver agree on the exact bytes.
//!
//! 3. **[`FlagSet`] for named-value sets.** Permitted licence activities and
//!    subscribed event types are both sets of named values supporting union,
//!    intersection and subset tests instead of ad hoc bit twiddling.
//!
//! 4. **[`CscError`] hierarchy.** Structured errors with `thiserror`. No
//!    `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod canonical;
pub mod error;
pub mod flags;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use error::{CanonicalizationError, CscError, ValidationError};
pub use flags::{Flag, FlagSet};
pub use identity::{
    CountryCode, CustomerId, EventId, LicenceId, ReclassificationId, SubscriptionId,
    SubstanceCode, ThresholdRuleId, TransactionId,
};
pub use temporal::Timestamp;
