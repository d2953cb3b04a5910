//! Engine configuration.
//!
//! Defaults match common regulatory practice (warn at 80 % of a limit,
//! tie-break equal-expiry licences by identifier). Override via
//! environment variables or explicit construction; tests construct it
//! directly.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Warning level applied to threshold rules that do not set their own.
pub const DEFAULT_WARNING_PERCENT: u32 = 80;

/// How to order covering licences whose effective end dates are equal.
///
/// Licence identifier is always the final key, so the choice stays
/// deterministic whatever the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageTieBreak {
    /// Lowest licence identifier first.
    #[default]
    LicenceId,
    /// Most period capacity left after the line first; uncapped first of all.
    MostRemainingCapacity,
    /// Oldest licence first.
    EarliestIssueDate,
}

impl CoverageTieBreak {
    /// Configuration spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LicenceId => "licence-id",
            Self::MostRemainingCapacity => "most-remaining-capacity",
            Self::EarliestIssueDate => "earliest-issue-date",
        }
    }
}

impl FromStr for CoverageTieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "licence-id" => Ok(Self::LicenceId),
            "most-remaining-capacity" => Ok(Self::MostRemainingCapacity),
            "earliest-issue-date" => Ok(Self::EarliestIssueDate),
            other => Err(format!(
                "unknown tie-break policy {other:?} (expected licence-id, most-remaining-capacity or earliest-issue-date)"
            )),
        }
    }
}

impl std::fmt::Display for CoverageTieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the decision engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Warning percent for rules without their own.
    pub default_warning_percent: Decimal,
    /// Ordering of equally ranked covering licences.
    pub coverage_tie_break: CoverageTieBreak,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_warning_percent: Decimal::from(DEFAULT_WARNING_PERCENT),
            coverage_tie_break: CoverageTieBreak::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CSC_WARNING_PERCENT` (default: 80)
    /// - `CSC_COVERAGE_TIE_BREAK` (default: `licence-id`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable or negative values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("CSC_WARNING_PERCENT") {
            let percent = Decimal::from_str(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                var: "CSC_WARNING_PERCENT",
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            config.default_warning_percent = percent;
        }
        if let Ok(raw) = std::env::var("CSC_COVERAGE_TIE_BREAK") {
            config.coverage_tie_break =
                raw.trim()
                    .parse()
                    .map_err(|reason| ConfigError::InvalidValue {
                        var: "CSC_COVERAGE_TIE_BREAK",
                        value: raw.clone(),
                        reason,
                    })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject a negative default warning percent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_warning_percent.is_sign_negative() && !self.default_warning_percent.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: "CSC_WARNING_PERCENT",
                value: self.default_warning_percent.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_warning_percent, Decimal::from(80));
        assert_eq!(config.coverage_tie_break, CoverageTieBreak::LicenceId);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tie_break_parses_config_spelling() {
        for policy in [
            CoverageTieBreak::LicenceId,
            CoverageTieBreak::MostRemainingCapacity,
            CoverageTieBreak::EarliestIssueDate,
        ] {
            assert_eq!(policy.as_str().parse::<CoverageTieBreak>().unwrap(), policy);
        }
        assert!("soonest".parse::<CoverageTieBreak>().is_err());
    }

    #[test]
    fn negative_warning_percent_rejected() {
        let config = EngineConfig {
            default_warning_percent: Decimal::from(-10),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
