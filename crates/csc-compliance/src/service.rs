//! # Validation Service
//!
//! Loads reference data through the repository traits, resolves product
//! references to substances and runs the [`TransactionValidator`].
//!
//! Repository failures and malformed reference data are operational errors
//! and propagate as [`ServiceError`]; they never turn into violations. A
//! transaction is only ever judged non-compliant on data that loaded.

use std::collections::BTreeMap;
use std::sync::Arc;

use csc_core::{Timestamp, TransactionId};
use csc_registry::{
    CustomerRepository, HolderRef, Licence, LicenceRepository, ProductResolver, SubstanceRepository,
    ThresholdRuleRepository, Transaction, TransactionRepository,
};

use crate::config::EngineConfig;
use crate::error::ServiceError;
use crate::usage::PeriodUsage;
use crate::validator::{ReferenceData, TransactionValidator, ValidationOutcome};

/// The repositories the service reads from.
#[derive(Clone)]
pub struct Repositories {
    /// Product reference to substance lookup.
    pub products: Arc<dyn ProductResolver>,
    /// Substance master data.
    pub substances: Arc<dyn SubstanceRepository>,
    /// Licences by holder.
    pub licences: Arc<dyn LicenceRepository>,
    /// Customer master data.
    pub customers: Arc<dyn CustomerRepository>,
    /// Threshold configuration.
    pub thresholds: Arc<dyn ThresholdRuleRepository>,
    /// Transaction store, for re-validation by identifier.
    pub transactions: Arc<dyn TransactionRepository>,
}

impl Repositories {
    /// Use one store for every repository.
    pub fn from_shared<R>(store: Arc<R>) -> Self
    where
        R: ProductResolver
            + SubstanceRepository
            + LicenceRepository
            + CustomerRepository
            + ThresholdRuleRepository
            + TransactionRepository
            + 'static,
    {
        Self {
            products: store.clone(),
            substances: store.clone(),
            licences: store.clone(),
            customers: store.clone(),
            thresholds: store.clone(),
            transactions: store,
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

/// Repository-backed validation.
#[derive(Debug, Clone)]
pub struct ValidationService {
    repos: Repositories,
    validator: TransactionValidator,
}

impl ValidationService {
    /// A service over `repos` with the given engine configuration.
    pub fn new(repos: Repositories, config: EngineConfig) -> Self {
        Self {
            repos,
            validator: TransactionValidator::new(config),
        }
    }

    /// Resolve, load and validate.
    ///
    /// `usage` is the caller's snapshot of prior consumption in the current
    /// period, excluding `tx` itself.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Repository`] when a repository fails,
    /// [`ServiceError::ReferenceData`] for unknown or malformed reference
    /// data, and [`ServiceError::Validator`] when the validator refuses.
    pub fn validate(
        &self,
        mut tx: Transaction,
        usage: &PeriodUsage,
        at: Timestamp,
    ) -> Result<ValidationOutcome, ServiceError> {
        let mut substances = BTreeMap::new();
        for line in &mut tx.lines {
            line.substance_code = self.repos.products.resolve(&line.product_ref)?;
            let Some(code) = &line.substance_code else {
                continue;
            };
            if substances.contains_key(code) {
                continue;
            }
            let substance = self.repos.substances.get_substance(code)?.ok_or_else(|| {
                ServiceError::ReferenceData(format!(
                    "product {} resolves to unknown substance {code}",
                    line.product_ref
                ))
            })?;
            substance.validate()?;
            substances.insert(code.clone(), substance);
        }

        let holder_licences = self.load_licences(&tx.holder)?;

        let customer = match &tx.customer_id {
            Some(id) => Some(
                self.repos
                    .customers
                    .get_customer(id)?
                    .ok_or_else(|| ServiceError::ReferenceData(format!("unknown customer {id}")))?,
            ),
            None => None,
        };
        let customer_licences = match &customer {
            Some(c) => self.load_licences(&HolderRef::Customer(c.id.clone()))?,
            None => Vec::new(),
        };

        let threshold_rules = self.repos.thresholds.threshold_rules()?;
        for rule in threshold_rules.iter().filter(|r| r.active) {
            rule.validate()?;
        }

        tracing::debug!(
            transaction = %tx.id,
            substances = substances.len(),
            holder_licences = holder_licences.len(),
            customer_licences = customer_licences.len(),
            threshold_rules = threshold_rules.len(),
            "reference data loaded"
        );

        let refs = ReferenceData {
            substances: &substances,
            holder_licences: &holder_licences,
            customer: customer.as_ref(),
            customer_licences: &customer_licences,
            threshold_rules: &threshold_rules,
            usage,
        };
        Ok(self.validator.validate(tx, &refs, at)?)
    }

    /// Load a stored transaction, validate it again and store the result.
    ///
    /// # Errors
    ///
    /// As [`validate`](Self::validate), plus [`ServiceError::ReferenceData`]
    /// for an unknown transaction.
    pub fn revalidate(
        &self,
        id: &TransactionId,
        usage: &PeriodUsage,
        at: Timestamp,
    ) -> Result<ValidationOutcome, ServiceError> {
        let tx = self
            .repos
            .transactions
            .get_transaction(id)?
            .ok_or_else(|| ServiceError::ReferenceData(format!("unknown transaction {id}")))?;
        let outcome = self.validate(tx, usage, at)?;
        self.repos.transactions.save_transaction(outcome.transaction.clone())?;
        Ok(outcome)
    }

    fn load_licences(&self, holder: &HolderRef) -> Result<Vec<Licence>, ServiceError> {
        let licences = self.repos.licences.licences_for_holder(holder)?;
        for licence in &licences {
            licence.validate()?;
        }
        Ok(licences)
    }
}
