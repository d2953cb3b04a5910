//! # Repository Interfaces
//!
//! The engine never talks to a database. It consumes these load-by-key and
//! list operations; deployments implement them over whatever store they
//! use. All operations are synchronous: validation runs against reference
//! data that is treated as immutable for the duration of one pass.
//!
//! A `None` from a `get` means "no such record". A store that cannot answer
//! returns [`RepositoryError`], which the engine propagates rather than
//! treating the transaction as non-compliant.

use csc_core::{CustomerId, LicenceId, SubstanceCode, TransactionId};

use crate::customer::Customer;
use crate::error::RepositoryError;
use crate::licence::{HolderRef, Licence};
use crate::substance::Substance;
use crate::threshold::ThresholdRule;
use crate::transaction::Transaction;

/// Resolves a caller-supplied product reference to a substance.
pub trait ProductResolver: Send + Sync {
    /// `Ok(None)` means the product contains no controlled substance.
    fn resolve(&self, product_ref: &str) -> Result<Option<SubstanceCode>, RepositoryError>;
}

/// Substance master data.
pub trait SubstanceRepository: Send + Sync {
    /// Load a substance by code.
    fn get_substance(&self, code: &SubstanceCode) -> Result<Option<Substance>, RepositoryError>;

    /// Store a substance.
    fn save_substance(&self, substance: Substance) -> Result<(), RepositoryError>;
}

/// Licence registry.
pub trait LicenceRepository: Send + Sync {
    /// Load a licence by identifier.
    fn get_licence(&self, id: &LicenceId) -> Result<Option<Licence>, RepositoryError>;

    /// Every licence held by `holder`, regardless of status.
    fn licences_for_holder(&self, holder: &HolderRef) -> Result<Vec<Licence>, RepositoryError>;

    /// Store a licence.
    fn save_licence(&self, licence: Licence) -> Result<(), RepositoryError>;
}

/// Customer registry.
pub trait CustomerRepository: Send + Sync {
    /// Load a customer by identifier.
    fn get_customer(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;
}

/// Threshold configuration.
pub trait ThresholdRuleRepository: Send + Sync {
    /// Every rule, active or not.
    fn threshold_rules(&self) -> Result<Vec<ThresholdRule>, RepositoryError>;
}

/// Transaction store.
pub trait TransactionRepository: Send + Sync {
    /// Load a transaction by identifier.
    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, RepositoryError>;

    /// Store a transaction.
    fn save_transaction(&self, transaction: Transaction) -> Result<(), RepositoryError>;
}
