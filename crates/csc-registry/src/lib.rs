//! # csc-registry — Compliance Data Model and Repository Interfaces
//!
//! The records the decision engine reads and writes:
//!
//! - **Substances** ([`substance`]): two-axis classification (narcotics list,
//!   precursor category) plus an unordered reclassification history.
//! - **Licences** ([`licence`]): holder, validity window with grace period,
//!   permitted [`ActivitySet`], and per-substance mappings with caps.
//! - **Customers** ([`customer`]): category and qualification status.
//! - **Threshold rules** ([`threshold`]): scoped quantity, frequency and
//!   value limits with warning and override-ceiling percentages.
//! - **Transactions** ([`transaction`]): lines, transport permits, the
//!   violation list, and override state. Overall status is always computed.
//! - **Violations** ([`violation`]): tagged details with a lookup table of
//!   severity and override defaults keyed by category.
//! - **Events** ([`event`]): the compliance events published to webhook
//!   subscribers, with an [`EventTypeSet`] for subscription matching.
//!
//! Persistence is external. [`repository`] declares the load/save
//! interfaces the engine consumes and [`memory`] provides `DashMap`-backed
//! implementations for tests and the operator CLI.

pub mod customer;
pub mod error;
pub mod event;
pub mod licence;
pub mod memory;
pub mod repository;
pub mod substance;
pub mod threshold;
pub mod transaction;
pub mod violation;

pub use customer::{Customer, CustomerCategory, QualificationStatus};
pub use error::{RegistryError, RepositoryError};
pub use event::{
    ComplianceEvent, EventPayload, EventType, EventTypeSet, LicenceChange, OverrideDecided,
    SubstanceReclassified, ThresholdWarningRaised, TransactionSummary,
};
pub use licence::{
    Activity, ActivitySet, HolderRef, Licence, LicenceStatus, LicenceValidity, PeriodKind,
    SubstanceMapping,
};
pub use memory::MemoryRegistry;
pub use repository::{
    CustomerRepository, LicenceRepository, ProductResolver, SubstanceRepository,
    ThresholdRuleRepository, TransactionRepository,
};
pub use substance::{
    Classification, NarcoticsList, PrecursorCategory, ReclassificationEvent,
    ReclassificationStatus, Substance,
};
pub use threshold::{ThresholdKind, ThresholdRule, ThresholdScope};
pub use transaction::{
    BaseUnit, CoverageOutcome, Direction, NoCoverageReason, OverrideDecision, OverrideStatus,
    PermitKind, Transaction, TransactionLine, TransactionType, TransportPermit, ValidationStatus,
};
pub use violation::{Severity, ThresholdContext, Violation, ViolationDefaults, ViolationDetail, ViolationType};
