//! # Error Hierarchy
//!
//! Structured error types shared across the compliance stack, built with
//! `thiserror`. Each subsystem crate defines its own error enum; the types
//! here cover the primitives owned by `csc-core`.

use thiserror::Error;

/// Top-level error type for `csc-core` operations.
#[derive(Error, Debug)]
pub enum CscError {
    /// Canonicalization failure while producing signed bytes.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Timestamp or date could not be parsed.
    #[error("temporal error: {0}")]
    Temporal(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Quantities and amounts must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer for quantities: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for identifier newtypes.
///
/// Each variant carries the rejected input so operators can find the
/// offending record without guesswork.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Substance code is empty, too long, or contains invalid characters.
    #[error("invalid substance code: \"{0}\" (expected 1-32 characters of A-Z, 0-9, '-', '_', '.')")]
    InvalidSubstanceCode(String),

    /// Licence identifier is empty or too long.
    #[error("invalid licence id: \"{0}\" (expected 1-64 non-whitespace characters)")]
    InvalidLicenceId(String),

    /// Customer identifier is empty or too long.
    #[error("invalid customer id: \"{0}\" (expected 1-64 non-whitespace characters)")]
    InvalidCustomerId(String),

    /// Threshold rule identifier is empty or too long.
    #[error("invalid threshold rule id: \"{0}\" (expected 1-64 non-whitespace characters)")]
    InvalidThresholdRuleId(String),

    /// Country code is not a two-letter ISO 3166-1 alpha-2 code.
    #[error("invalid country code: \"{0}\" (expected ISO 3166-1 alpha-2, e.g. \"NL\")")]
    InvalidCountryCode(String),

    /// A named flag was not recognized.
    #[error("unknown {kind} flag: \"{value}\"")]
    UnknownFlag {
        /// The flag family (e.g. "activity", "event type").
        kind: &'static str,
        /// The rejected value.
        value: String,
    },
}
