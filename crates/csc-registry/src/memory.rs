//! In-memory repositories backed by `DashMap`.
//!
//! [`MemoryRegistry`] implements every repository trait over shared maps.
//! Clones share the same data. Used by tests and by the operator CLI, which
//! loads a reference bundle from disk into it.

use std::sync::Arc;

use csc_core::{CustomerId, LicenceId, SubstanceCode, ThresholdRuleId, TransactionId};
use dashmap::DashMap;

use crate::customer::Customer;
use crate::error::RepositoryError;
use crate::licence::{HolderRef, Licence};
use crate::repository::{
    CustomerRepository, LicenceRepository, ProductResolver, SubstanceRepository,
    ThresholdRuleRepository, TransactionRepository,
};
use crate::substance::Substance;
use crate::threshold::ThresholdRule;
use crate::transaction::Transaction;

#[derive(Default)]
struct Inner {
    products: DashMap<String, Option<SubstanceCode>>,
    substances: DashMap<SubstanceCode, Substance>,
    licences: DashMap<LicenceId, Licence>,
    customers: DashMap<CustomerId, Customer>,
    thresholds: DashMap<ThresholdRuleId, ThresholdRule>,
    transactions: DashMap<TransactionId, Transaction>,
}

/// Shared in-memory reference data and transaction store.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<Inner>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a product reference to a substance, or to `None` for an
    /// uncontrolled product.
    pub fn insert_product(&self, product_ref: impl Into<String>, substance: Option<SubstanceCode>) {
        self.inner.products.insert(product_ref.into(), substance);
    }

    /// Add or replace a substance.
    pub fn insert_substance(&self, substance: Substance) {
        self.inner.substances.insert(substance.code.clone(), substance);
    }

    /// Add or replace a licence.
    pub fn insert_licence(&self, licence: Licence) {
        self.inner.licences.insert(licence.id.clone(), licence);
    }

    /// Add or replace a customer.
    pub fn insert_customer(&self, customer: Customer) {
        self.inner.customers.insert(customer.id.clone(), customer);
    }

    /// Add or replace a threshold rule.
    pub fn insert_threshold_rule(&self, rule: ThresholdRule) {
        self.inner.thresholds.insert(rule.id.clone(), rule);
    }
}

impl std::fmt::Debug for MemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRegistry")
            .field("products", &self.inner.products.len())
            .field("substances", &self.inner.substances.len())
            .field("licences", &self.inner.licences.len())
            .field("customers", &self.inner.customers.len())
            .field("thresholds", &self.inner.thresholds.len())
            .field("transactions", &self.inner.transactions.len())
            .finish()
    }
}

impl ProductResolver for MemoryRegistry {
    fn resolve(&self, product_ref: &str) -> Result<Option<SubstanceCode>, RepositoryError> {
        Ok(self
            .inner
            .products
            .get(product_ref)
            .and_then(|entry| entry.value().clone()))
    }
}

impl SubstanceRepository for MemoryRegistry {
    fn get_substance(&self, code: &SubstanceCode) -> Result<Option<Substance>, RepositoryError> {
        Ok(self.inner.substances.get(code).map(|e| e.value().clone()))
    }

    fn save_substance(&self, substance: Substance) -> Result<(), RepositoryError> {
        self.insert_substance(substance);
        Ok(())
    }
}

impl LicenceRepository for MemoryRegistry {
    fn get_licence(&self, id: &LicenceId) -> Result<Option<Licence>, RepositoryError> {
        Ok(self.inner.licences.get(id).map(|e| e.value().clone()))
    }

    fn licences_for_holder(&self, holder: &HolderRef) -> Result<Vec<Licence>, RepositoryError> {
        let mut licences: Vec<Licence> = self
            .inner
            .licences
            .iter()
            .filter(|e| e.value().holder == *holder)
            .map(|e| e.value().clone())
            .collect();
        // DashMap iteration order is unspecified.
        licences.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(licences)
    }

    fn save_licence(&self, licence: Licence) -> Result<(), RepositoryError> {
        self.insert_licence(licence);
        Ok(())
    }
}

impl CustomerRepository for MemoryRegistry {
    fn get_customer(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.inner.customers.get(id).map(|e| e.value().clone()))
    }
}

impl ThresholdRuleRepository for MemoryRegistry {
    fn threshold_rules(&self) -> Result<Vec<ThresholdRule>, RepositoryError> {
        let mut rules: Vec<ThresholdRule> = self
            .inner
            .thresholds
            .iter()
            .map(|e| e.value().clone())
            .collect();
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rules)
    }
}

impl TransactionRepository for MemoryRegistry {
    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, RepositoryError> {
        Ok(self.inner.transactions.get(id).map(|e| e.value().clone()))
    }

    fn save_transaction(&self, transaction: Transaction) -> Result<(), RepositoryError> {
        self.inner.transactions.insert(transaction.id, transaction);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::licence::{ActivitySet, LicenceStatus};
    use crate::substance::{Classification, NarcoticsList};
    use chrono::NaiveDate;

    fn licence(id: &str, holder: HolderRef) -> Licence {
        Licence {
            id: LicenceId::new(id).unwrap(),
            holder,
            issuing_authority: "Farmatec".to_string(),
            licence_type: "opium_act".to_string(),
            licence_number: id.to_string(),
            issue_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            expiry_date: None,
            grace_period_end: None,
            status: LicenceStatus::Valid,
            activities: ActivitySet::empty(),
            mappings: vec![],
        }
    }

    #[test]
    fn product_resolution_distinguishes_uncontrolled_and_unknown() {
        let reg = MemoryRegistry::new();
        reg.insert_product("SKU-1", Some(SubstanceCode::new("MORPHINE").unwrap()));
        reg.insert_product("SKU-LACTOSE", None);
        assert_eq!(reg.resolve("SKU-1").unwrap().unwrap().as_str(), "MORPHINE");
        assert_eq!(reg.resolve("SKU-LACTOSE").unwrap(), None);
        assert_eq!(reg.resolve("SKU-UNKNOWN").unwrap(), None);
    }

    #[test]
    fn licences_for_holder_filters_and_sorts() {
        let reg = MemoryRegistry::new();
        let customer = HolderRef::Customer(CustomerId::new("C-1").unwrap());
        reg.insert_licence(licence("L-B", HolderRef::Company));
        reg.insert_licence(licence("L-A", HolderRef::Company));
        reg.insert_licence(licence("L-C", customer.clone()));

        let own: Vec<String> = reg
            .licences_for_holder(&HolderRef::Company)
            .unwrap()
            .into_iter()
            .map(|l| l.id.to_string())
            .collect();
        assert_eq!(own, vec!["L-A", "L-B"]);
        assert_eq!(reg.licences_for_holder(&customer).unwrap().len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let reg = MemoryRegistry::new();
        let clone = reg.clone();
        let code = SubstanceCode::new("CODEINE").unwrap();
        clone.insert_substance(Substance::new(
            code.clone(),
            "Codeine",
            Classification::narcotic(NarcoticsList::II),
        ));
        assert!(reg.get_substance(&code).unwrap().is_some());
    }
}
