//! # csc-crypto — Webhook Signing for the Compliance Stack
//!
//! Outbound notifications are authenticated with a keyed message
//! authentication code so that receivers can reject forged or tampered
//! deliveries:
//!
//! - [`WebhookSecret`] holds a subscriber's signing secret. It enforces a
//!   minimum length, never prints its contents, and is zeroized on drop.
//! - [`sign_payload`] computes `sha256=<lowercase hex>` over
//!   [`CanonicalBytes`](csc_core::CanonicalBytes).
//! - [`verify_signature`] recomputes the signature and compares it
//!   case-insensitively in constant time. Receivers use it; the dispatcher
//!   never verifies its own output.

pub mod error;
pub mod secret;
pub mod signature;

pub use error::CryptoError;
pub use secret::{WebhookSecret, MIN_SECRET_LEN};
pub use signature::{sign_bytes, sign_payload, verify_signature, SIGNATURE_PREFIX};
