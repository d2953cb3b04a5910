//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the compliance stack.
//! Each identifier is a distinct type: you cannot pass a [`CustomerId`]
//! where a [`LicenceId`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`SubstanceCode`], [`LicenceId`], [`CustomerId`],
//! [`ThresholdRuleId`], [`CountryCode`]) validate format at construction time
//! and at deserialization time. UUID-based identifiers ([`TransactionId`],
//! [`SubscriptionId`], [`EventId`], [`ReclassificationId`]) are always valid
//! by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Implement `Deserialize` for string newtypes that must validate their
/// contents. Deserializes as a plain `String`, then routes through the
/// type's `new()` constructor so invalid values are rejected at the
/// boundary rather than silently accepted.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Define a UUID-backed identifier with the standard constructor set.
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $ty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self)
            }
        }
    };
}

/// Define an opaque string identifier (1-64 non-whitespace characters).
macro_rules! opaque_identifier {
    ($(#[$meta:meta])* $ty:ident, $err:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $ty(String);

        impl_validating_deserialize!($ty);

        impl $ty {
            /// Create the identifier, rejecting empty, over-long, or
            /// whitespace-containing values.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                if s.is_empty() || s.len() > 64 || s.chars().any(char::is_whitespace) {
                    return Err(ValidationError::$err(s));
                }
                Ok(Self(s))
            }

            /// Access the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

uuid_identifier!(
    /// Unique identifier for a submitted transaction.
    TransactionId
);

uuid_identifier!(
    /// Unique identifier for a webhook subscription.
    SubscriptionId
);

uuid_identifier!(
    /// Opaque unique identifier carried by every outbound event (`eventId`).
    EventId
);

uuid_identifier!(
    /// Unique identifier for a reclassification event in a substance history.
    ReclassificationId
);

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

opaque_identifier!(
    /// Identifier of a licence, as issued by the licence registry.
    LicenceId,
    InvalidLicenceId
);

opaque_identifier!(
    /// Identifier of a customer in the external customer registry.
    CustomerId,
    InvalidCustomerId
);

opaque_identifier!(
    /// Identifier of a configured threshold rule.
    ThresholdRuleId,
    InvalidThresholdRuleId
);

/// Business key of a controlled substance (e.g. `MORPHINE`, `EPHEDRINE-HCL`).
///
/// # Validation
///
/// - 1 to 32 characters
/// - uppercase ASCII letters, digits, `-`, `_` and `.`
///
/// Lowercase input is normalized to uppercase so that codes coming from
/// product lookups compare equal regardless of source casing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SubstanceCode(String);

impl_validating_deserialize!(SubstanceCode);

impl SubstanceCode {
    /// Create a substance code, normalizing to uppercase.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidSubstanceCode`] if the value is
    /// empty, longer than 32 characters, or has characters outside the
    /// permitted set.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_uppercase();
        let valid = !normalized.is_empty()
            && normalized.len() <= 32
            && normalized
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(ValidationError::InvalidSubstanceCode(raw));
        }
        Ok(Self(normalized))
    }

    /// Access the code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubstanceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SubstanceCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// ISO 3166-1 alpha-2 country code (e.g. `NL`, `DE`).
///
/// Used by cross-border permit rules: a transaction is cross-border when
/// origin and destination codes differ.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl_validating_deserialize!(CountryCode);

impl CountryCode {
    /// Create a country code, normalizing to uppercase.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.len() != 2 || !normalized.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCountryCode(raw));
        }
        Ok(Self(normalized))
    }

    /// Access the two-letter code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CountryCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
