//! # Threshold Rules
//!
//! A threshold rule limits the quantity, frequency or declared value of
//! transactions within its scope. Rules without a period apply to each line
//! on its own; rules with a period apply to the cumulative total for the
//! period, which the caller supplies.
//!
//! Percentages are expressed as whole-number percents of the limit
//! (`80` means 80 %).

use csc_core::{CustomerId, SubstanceCode, ThresholdRuleId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::customer::CustomerCategory;
use crate::error::RegistryError;
use crate::licence::PeriodKind;
use crate::substance::{NarcoticsList, PrecursorCategory};

/// What a threshold rule measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    /// Quantity in the line's base unit.
    Quantity,
    /// Number of transaction lines.
    Frequency,
    /// Declared monetary value.
    Value,
}

impl ThresholdKind {
    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quantity => "quantity",
            Self::Frequency => "frequency",
            Self::Value => "value",
        }
    }
}

impl std::fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which transactions a rule applies to.
///
/// Every field that is set must match; an empty scope matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdScope {
    /// A single substance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substance_code: Option<SubstanceCode>,
    /// Substances on this narcotics list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narcotics_list: Option<NarcoticsList>,
    /// Substances in this precursor category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precursor_category: Option<PrecursorCategory>,
    /// Customers of this category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_category: Option<CustomerCategory>,
    /// One specific customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    /// Lines covered by a licence of this type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licence_type: Option<String>,
}

fn default_active() -> bool {
    true
}

/// A configured limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Rule identifier.
    pub id: ThresholdRuleId,
    /// Display name.
    pub name: String,
    /// Measured quantity.
    pub kind: ThresholdKind,
    /// Applicability.
    #[serde(default)]
    pub scope: ThresholdScope,
    /// Maximum permitted value; anything strictly above is a breach.
    pub limit: Decimal,
    /// Unit label for messages (e.g. `g`, `lines`, `EUR`).
    pub unit: String,
    /// Warning level as a percent of `limit`. The engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_percent: Option<Decimal>,
    /// Whether a breach may be overridden by a human decision.
    #[serde(default)]
    pub allow_override: bool,
    /// Hard ceiling, as a percent of `limit`, above which no override is possible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_override_percent: Option<Decimal>,
    /// Cumulative period. `None` evaluates each line on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<PeriodKind>,
    /// Inactive rules are ignored.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ThresholdRule {
    /// True for rules evaluated against a period total.
    pub fn is_cumulative(&self) -> bool {
        self.period.is_some()
    }

    /// Reject negative limits and percentages.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidThresholdRule`] naming the field.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let checks = [
            ("limit", Some(self.limit)),
            ("warning_percent", self.warning_percent),
            ("max_override_percent", self.max_override_percent),
        ];
        for (field, value) in checks {
            if let Some(v) = value {
                if v.is_sign_negative() && !v.is_zero() {
                    return Err(RegistryError::InvalidThresholdRule {
                        rule_id: self.id.clone(),
                        reason: format!("{field} must not be negative, got {v}"),
                    });
                }
            }
        }
        Ok(())
    }
}
