//! # Compliance Error Types
//!
//! Violations are values and never appear here. These errors cover the
//! three other outcomes:
//!
//! - **Operational**: the reference data could not be loaded or is
//!   malformed ([`ServiceError`], [`ValidatorError::UnknownSubstance`]).
//! - **Contract misuse**: validating a final transaction
//!   ([`ValidatorError::AlreadyFinal`]) or approving an override above its
//!   hard ceiling ([`OverrideGateError::CeilingExceeded`]).
//! - **Configuration**: an unusable environment value ([`ConfigError`]).

use csc_core::{CustomerId, SubstanceCode, ThresholdRuleId, TransactionId};
use csc_registry::{RegistryError, RepositoryError, ValidationStatus};
use csc_state::OverrideError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Threshold evaluation received contractually invalid input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThresholdError {
    /// The rule carries a negative limit or percentage.
    #[error(transparent)]
    InvalidRule(#[from] RegistryError),

    /// The configured default warning percent is negative.
    #[error("default warning percent must not be negative, got {0}")]
    NegativeDefaultWarning(Decimal),
}

/// Errors from [`TransactionValidator`](crate::TransactionValidator).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    /// The transaction is in a final status and cannot be validated again.
    #[error("transaction {id} is {status} and cannot be re-validated")]
    AlreadyFinal {
        /// Transaction identifier.
        id: TransactionId,
        /// Its current status.
        status: ValidationStatus,
    },

    /// A line names a substance absent from the supplied reference data.
    #[error("line {line_number} refers to unknown substance {code}")]
    UnknownSubstance {
        /// Offending line.
        line_number: u32,
        /// Missing substance.
        code: SubstanceCode,
    },

    /// The transaction names a customer absent from the supplied reference data.
    #[error("unknown customer {0}")]
    UnknownCustomer(CustomerId),

    /// A threshold rule could not be evaluated.
    #[error("threshold evaluation failed: {0}")]
    Threshold(#[from] ThresholdError),
}

/// Errors from [`ValidationService`](crate::ValidationService).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A repository could not answer.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Reference data is missing or malformed.
    #[error("reference data error: {0}")]
    ReferenceData(String),

    /// The validator refused or failed.
    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        Self::ReferenceData(err.to_string())
    }
}

/// Errors from [`OverrideGate`](crate::OverrideGate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverrideGateError {
    /// A breach exceeds its rule's hard override ceiling.
    #[error("threshold {rule_id}: value {value} exceeds override ceiling {ceiling}; override cannot be approved")]
    CeilingExceeded {
        /// Rule whose ceiling was exceeded.
        rule_id: ThresholdRuleId,
        /// Evaluated value.
        value: Decimal,
        /// The ceiling.
        ceiling: Decimal,
    },

    /// The workflow refused the decision.
    #[error(transparent)]
    Workflow(#[from] OverrideError),
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
        /// Parser message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_final_display() {
        let id = TransactionId::new();
        let err = ValidatorError::AlreadyFinal {
            id,
            status: ValidationStatus::Passed,
        };
        let msg = err.to_string();
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("passed"));
    }

    #[test]
    fn registry_error_becomes_reference_data() {
        let err: ServiceError = RegistryError::InvalidHolder("x".to_string()).into();
        assert!(matches!(err, ServiceError::ReferenceData(_)));
    }

    #[test]
    fn ceiling_display_names_rule() {
        let err = OverrideGateError::CeilingExceeded {
            rule_id: ThresholdRuleId::new("T-1").unwrap(),
            value: Decimal::from(200),
            ceiling: Decimal::from(150),
        };
        assert!(err.to_string().contains("T-1"));
        assert!(err.to_string().contains("150"));
    }
}
