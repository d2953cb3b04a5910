//! # Cryptographic Error Types
//!
//! Structured errors for secret handling and signature verification.

use thiserror::Error;

/// Errors from cryptographic operations in `csc-crypto`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The signing secret is shorter than the enforced minimum.
    #[error("webhook secret too short: expected at least {min} characters, got {actual}")]
    SecretTooShort {
        /// Minimum accepted length.
        min: usize,
        /// Length of the rejected secret.
        actual: usize,
    },

    /// The supplied signature header is not of the form `sha256=<hex>`.
    #[error("malformed signature header: {0}")]
    MalformedSignature(String),

    /// The signature did not match the payload.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The secret could not be used as a MAC key.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}
