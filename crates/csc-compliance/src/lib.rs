//! # csc-compliance — Compliance Decision Engine
//!
//! Decides, line by line, whether a transaction involving controlled
//! substances may proceed.
//!
//! ## Components
//!
//! - **Classification** ([`classification`]): the classification in force
//!   on a past date, across an unordered reclassification history.
//! - **Coverage** ([`coverage`]): which licence covers a line, ranked by
//!   soonest effective end with a configurable tie-break.
//! - **Thresholds** ([`threshold`]): quantity, frequency and value limits
//!   with warning levels and override ceilings.
//! - **Validator** ([`validator`]): runs the checks over immutable
//!   reference data and returns the next transaction state plus events.
//! - **Service** ([`service`]): loads reference data through repositories.
//! - **Override gate** ([`override_gate`]): enforces threshold ceilings
//!   before delegating approvals to the override workflow.
//!
//! ## Statelessness
//!
//! The engine keeps no running totals. Period consumption is supplied by
//! the caller as a [`PeriodUsage`] snapshot, so independent transactions
//! can be validated in parallel without locking.

pub mod classification;
pub mod config;
pub mod coverage;
pub mod error;
pub mod override_gate;
pub mod service;
pub mod threshold;
pub mod usage;
pub mod validator;

pub use classification::{classification_as_of, has_been_reclassified_since};
pub use config::{CoverageTieBreak, EngineConfig, DEFAULT_WARNING_PERCENT};
pub use coverage::{required_activities, CoverageDecision, CoverageMatcher, CoverageRequest};
pub use error::{ConfigError, OverrideGateError, ServiceError, ThresholdError, ValidatorError};
pub use override_gate::OverrideGate;
pub use service::{Repositories, ValidationService};
pub use threshold::{scope_matches, ScopeContext, ThresholdEvaluator, ThresholdOutcome};
pub use usage::{LicenceUsage, PeriodUsage};
pub use validator::{Evaluation, ReferenceData, TransactionValidator, ValidationOutcome, ValidationResult};
