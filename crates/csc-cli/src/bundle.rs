//! # Reference Bundles
//!
//! A bundle is a single JSON or YAML document holding the reference data
//! one validation needs: product mapping, substances, licences, customers,
//! threshold rules, and the prior-usage snapshot for the current period.
//!
//! ```yaml
//! products:
//!   SKU-MORPH-10: MORPHINE
//!   SKU-PARACETAMOL: null
//! substances: [...]
//! licences: [...]
//! customers: [...]
//! threshold_rules: [...]
//! usage:
//!   thresholds: { T-MORPH-DAY: "40" }
//! ```
//!
//! The format is chosen by file extension: `.yaml` and `.yml` are YAML,
//! anything else is JSON.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use csc_compliance::PeriodUsage;
use csc_core::SubstanceCode;
use csc_registry::{Customer, Licence, MemoryRegistry, Substance, ThresholdRule};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Reference data for offline validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceBundle {
    /// Product reference → substance code; `null` for uncontrolled products.
    #[serde(default)]
    pub products: BTreeMap<String, Option<SubstanceCode>>,
    /// Substance master data.
    #[serde(default)]
    pub substances: Vec<Substance>,
    /// Licences of the company and its customers.
    #[serde(default)]
    pub licences: Vec<Licence>,
    /// Customer master data.
    #[serde(default)]
    pub customers: Vec<Customer>,
    /// Threshold rules.
    #[serde(default)]
    pub threshold_rules: Vec<ThresholdRule>,
    /// Prior consumption in the current period.
    #[serde(default)]
    pub usage: PeriodUsage,
}

impl ReferenceBundle {
    /// Load a bundle from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        read_document(path).with_context(|| format!("failed to load reference bundle {}", path.display()))
    }

    /// Look up a substance by code.
    pub fn substance(&self, code: &SubstanceCode) -> Option<&Substance> {
        self.substances.iter().find(|s| &s.code == code)
    }

    /// Populate an in-memory registry.
    pub fn to_registry(&self) -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        for (product_ref, substance) in &self.products {
            registry.insert_product(product_ref.clone(), substance.clone());
        }
        for substance in &self.substances {
            registry.insert_substance(substance.clone());
        }
        for licence in &self.licences {
            registry.insert_licence(licence.clone());
        }
        for customer in &self.customers {
            registry.insert_customer(customer.clone());
        }
        for rule in &self.threshold_rules {
            registry.insert_threshold_rule(rule.clone());
        }
        tracing::debug!(
            products = self.products.len(),
            substances = self.substances.len(),
            licences = self.licences.len(),
            customers = self.customers.len(),
            threshold_rules = self.threshold_rules.len(),
            "reference bundle loaded"
        );
        registry
    }
}

/// Read a JSON or YAML document, chosen by extension.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&raw).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}
