//! Notification error types.
//!
//! Subscriber-side failures ([`TransportError`]) are handled by the retry
//! and circuit-breaker logic and never reach the business caller. The
//! remaining errors concern the dispatcher's own inputs and collaborators.

use csc_core::CanonicalizationError;
use csc_crypto::CryptoError;
use csc_registry::RepositoryError;
use thiserror::Error;

/// A single delivery attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The subscriber answered with a non-2xx status.
    #[error("subscriber responded with HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("request failed: {0}")]
    Request(String),
}

/// Errors from building or dispatching notifications.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The event payload could not be serialized.
    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    /// The payload could not be canonicalized.
    #[error("payload canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A signing secret was rejected.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The subscription store failed.
    #[error("subscription store error: {0}")]
    Repository(#[from] RepositoryError),

    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    Client(String),

    /// The alert sink could not raise an alert.
    #[error("alert sink failed: {0}")]
    Alert(String),
}

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}
