//! # Registry Error Types
//!
//! Two families, kept apart so callers can tell them apart:
//!
//! - [`RegistryError`]: a record violates a structural invariant (a licence
//!   mapping outside its licence window, a negative threshold limit). This
//!   is malformed reference data, not a compliance outcome.
//! - [`RepositoryError`]: the backing store could not answer.

use csc_core::{LicenceId, SubstanceCode, ThresholdRuleId};
use thiserror::Error;

/// A reference-data record violates one of its invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Licence or one of its substance mappings is inconsistent.
    #[error("licence {licence_id} is malformed: {reason}")]
    InvalidLicence {
        /// The offending licence.
        licence_id: LicenceId,
        /// What is wrong with it.
        reason: String,
    },

    /// Substance classification or reclassification history is inconsistent.
    #[error("substance {code} is malformed: {reason}")]
    InvalidSubstance {
        /// The offending substance.
        code: SubstanceCode,
        /// What is wrong with it.
        reason: String,
    },

    /// Threshold rule carries a negative limit or percentage.
    #[error("threshold rule {rule_id} is malformed: {reason}")]
    InvalidThresholdRule {
        /// The offending rule.
        rule_id: ThresholdRuleId,
        /// What is wrong with it.
        reason: String,
    },

    /// A string could not be parsed as a holder reference.
    #[error("invalid holder reference: \"{0}\" (expected \"company\" or \"customer:<id>\")")]
    InvalidHolder(String),
}

/// The backing store failed to load or save a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The store could not be reached or timed out.
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("corrupt record {key}: {reason}")]
    Corrupt {
        /// Key of the record that failed to decode.
        key: String,
        /// Decoder message.
        reason: String,
    },
}
