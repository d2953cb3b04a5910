//! Caller-supplied period usage.
//!
//! The engine keeps no running totals. Cumulative checks need to know how
//! much was already consumed in the current period by other transactions,
//! and the caller supplies that as a [`PeriodUsage`] snapshot. Quantities
//! of the transaction being validated must not be included.

use std::collections::BTreeMap;

use csc_core::{LicenceId, SubstanceCode, ThresholdRuleId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quantity already drawn from one licence mapping in the current period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenceUsage {
    /// Licence drawn from.
    pub licence_id: LicenceId,
    /// Substance of the mapping.
    pub substance_code: SubstanceCode,
    /// Quantity consumed so far in the mapping's period.
    pub quantity: Decimal,
}

/// Prior consumption in the current period, excluding the transaction
/// under validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodUsage {
    /// Per licence mapping.
    #[serde(default)]
    pub licences: Vec<LicenceUsage>,
    /// Per cumulative threshold rule: prior period total in the rule's unit.
    #[serde(default)]
    pub thresholds: BTreeMap<ThresholdRuleId, Decimal>,
}

impl PeriodUsage {
    /// No prior usage.
    pub fn none() -> Self {
        Self::default()
    }

    /// Record licence usage.
    pub fn with_licence(mut self, licence_id: LicenceId, substance_code: SubstanceCode, quantity: Decimal) -> Self {
        self.licences.push(LicenceUsage {
            licence_id,
            substance_code,
            quantity,
        });
        self
    }

    /// Record a cumulative threshold total.
    pub fn with_threshold(mut self, rule_id: ThresholdRuleId, total: Decimal) -> Self {
        self.thresholds.insert(rule_id, total);
        self
    }

    /// Prior quantity drawn from `licence_id` for `substance`.
    pub fn licence_usage(&self, licence_id: &LicenceId, substance: &SubstanceCode) -> Decimal {
        self.licences
            .iter()
            .filter(|u| u.licence_id == *licence_id && u.substance_code == *substance)
            .map(|u| u.quantity)
            .sum()
    }

    /// Prior period total for a cumulative rule.
    pub fn threshold_usage(&self, rule_id: &ThresholdRuleId) -> Decimal {
        self.thresholds.get(rule_id).copied().unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn licence_usage_sums_matching_entries() {
        let l = LicenceId::new("OW-1").unwrap();
        let m = SubstanceCode::new("MORPHINE").unwrap();
        let usage = PeriodUsage::none()
            .with_licence(l.clone(), m.clone(), Decimal::from(40))
            .with_licence(l.clone(), m.clone(), Decimal::from(15))
            .with_licence(l.clone(), SubstanceCode::new("CODEINE").unwrap(), Decimal::from(99));
        assert_eq!(usage.licence_usage(&l, &m), Decimal::from(55));
        assert_eq!(
            usage.licence_usage(&LicenceId::new("OW-2").unwrap(), &m),
            Decimal::ZERO
        );
    }

    #[test]
    fn threshold_usage_deserializes_from_map() {
        let usage: PeriodUsage = serde_json::from_value(serde_json::json!({
            "thresholds": {"T-MONTHLY": "450"}
        }))
        .unwrap();
        let rule = ThresholdRuleId::new("T-MONTHLY").unwrap();
        assert_eq!(usage.threshold_usage(&rule), Decimal::from(450));
        assert!(usage.licences.is_empty());
    }
}
