//! # Violations
//!
//! A violation is a data-driven compliance finding, never an error. Each
//! category is a variant of [`ViolationDetail`] carrying the context that
//! category needs; severity, override eligibility and machine code come
//! from a lookup table keyed by [`ViolationType`].
//!
//! ## Defaults
//!
//! | Category                     | Severity | Override | Code                          |
//! |------------------------------|----------|----------|-------------------------------|
//! | licence missing              | critical | no       | `LICENCE_MISSING`             |
//! | licence expired              | critical | no       | `LICENCE_EXPIRED`             |
//! | licence in grace period      | warning  | no       | `LICENCE_IN_GRACE_PERIOD`     |
//! | threshold exceeded           | critical | per rule | `THRESHOLD_EXCEEDED`          |
//! | threshold warning            | warning  | no       | `THRESHOLD_WARNING`           |
//! | customer ineligible          | critical | yes      | `CUSTOMER_INELIGIBLE`         |
//! | customer licence missing     | critical | no       | `CUSTOMER_LICENCE_MISSING`    |
//! | cross-border permit missing  | critical | no       | `CROSS_BORDER_PERMIT_MISSING` |
//!
//! Only critical violations block. Override eligibility of a non-blocking
//! violation is irrelevant and defaults to `false`.

use chrono::NaiveDate;
use csc_core::{CountryCode, CustomerId, LicenceId, SubstanceCode, ThresholdRuleId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::customer::QualificationStatus;
use crate::threshold::ThresholdKind;
use crate::transaction::PermitKind;

/// How serious a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Needs attention; does not block.
    Warning,
    /// Blocks the transaction.
    Critical,
}

impl Severity {
    /// True if a violation of this severity blocks the transaction.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Critical)
    }

    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violation category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// No licence covers the line.
    LicenceMissing,
    /// The only candidate licences are expired.
    LicenceExpired,
    /// Covered, but only through a grace period.
    LicenceInGracePeriod,
    /// A threshold limit was exceeded.
    ThresholdExceeded,
    /// A threshold's warning level was reached.
    ThresholdWarning,
    /// The customer is not qualified.
    CustomerIneligible,
    /// The customer lacks its own licence for a listed narcotic.
    CustomerLicenceMissing,
    /// A cross-border movement lacks its permit.
    CrossBorderPermitMissing,
}

/// Severity and override defaults for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViolationDefaults {
    /// Default severity.
    pub severity: Severity,
    /// Default override eligibility.
    pub override_eligible: bool,
}

impl ViolationType {
    /// Look up the defaults for this category.
    pub const fn defaults(self) -> ViolationDefaults {
        let (severity, override_eligible) = match self {
            Self::LicenceMissing => (Severity::Critical, false),
            Self::LicenceExpired => (Severity::Critical, false),
            Self::LicenceInGracePeriod => (Severity::Warning, false),
            Self::ThresholdExceeded => (Severity::Critical, true),
            Self::ThresholdWarning => (Severity::Warning, false),
            Self::CustomerIneligible => (Severity::Critical, true),
            Self::CustomerLicenceMissing => (Severity::Critical, false),
            Self::CrossBorderPermitMissing => (Severity::Critical, false),
        };
        ViolationDefaults {
            severity,
            override_eligible,
        }
    }

    /// Machine-checkable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::LicenceMissing => "LICENCE_MISSING",
            Self::LicenceExpired => "LICENCE_EXPIRED",
            Self::LicenceInGracePeriod => "LICENCE_IN_GRACE_PERIOD",
            Self::ThresholdExceeded => "THRESHOLD_EXCEEDED",
            Self::ThresholdWarning => "THRESHOLD_WARNING",
            Self::CustomerIneligible => "CUSTOMER_INELIGIBLE",
            Self::CustomerLicenceMissing => "CUSTOMER_LICENCE_MISSING",
            Self::CrossBorderPermitMissing => "CROSS_BORDER_PERMIT_MISSING",
        }
    }
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Threshold evaluation context attached to threshold violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdContext {
    /// Rule that fired.
    pub rule_id: ThresholdRuleId,
    /// Rule display name.
    pub rule_name: String,
    /// What the rule measures.
    pub kind: ThresholdKind,
    /// Substance of the line, for per-line rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substance_code: Option<SubstanceCode>,
    /// Evaluated value (line value or period total).
    pub value: Decimal,
    /// Configured limit.
    pub limit: Decimal,
    /// Value at which the warning starts.
    pub warning_level: Decimal,
    /// Value above which no override is possible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_ceiling: Option<Decimal>,
    /// Unit label.
    pub unit: String,
    /// True when `value` is a period total.
    #[serde(default)]
    pub cumulative: bool,
}

impl ThresholdContext {
    /// True if the value is above the hard override ceiling.
    pub fn exceeds_override_ceiling(&self) -> bool {
        self.override_ceiling.is_some_and(|ceiling| self.value > ceiling)
    }
}

/// Category-specific violation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationDetail {
    /// No licence covers the line.
    LicenceMissing {
        /// Substance of the line.
        substance_code: SubstanceCode,
        /// Licences that covered the line but lacked capacity.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        capacity_exhausted: Vec<LicenceId>,
    },
    /// Candidates exist but failed only the expiry or grace check.
    LicenceExpired {
        /// Substance of the line.
        substance_code: SubstanceCode,
        /// The expired candidates.
        licence_ids: Vec<LicenceId>,
    },
    /// Covered by a licence that is past expiry but inside its grace period.
    LicenceInGracePeriod {
        /// Substance of the line.
        substance_code: SubstanceCode,
        /// Covering licence.
        licence_id: LicenceId,
        /// End of the grace period.
        grace_period_end: NaiveDate,
    },
    /// A limit was exceeded.
    ThresholdExceeded(ThresholdContext),
    /// A warning level was reached.
    ThresholdWarning(ThresholdContext),
    /// The customer is not approved.
    CustomerIneligible {
        /// The customer.
        customer_id: CustomerId,
        /// Its qualification status.
        qualification: QualificationStatus,
    },
    /// The customer lacks its own licence.
    CustomerLicenceMissing {
        /// The customer.
        customer_id: CustomerId,
        /// The narcotics-listed substance.
        substance_code: SubstanceCode,
    },
    /// A cross-border movement lacks a valid permit.
    CrossBorderPermitMissing {
        /// The permit that is required.
        required: PermitKind,
        /// Origin country.
        origin: CountryCode,
        /// Destination country.
        destination: CountryCode,
    },
}

impl ViolationDetail {
    /// Category tag of this detail.
    pub fn violation_type(&self) -> ViolationType {
        match self {
            Self::LicenceMissing { .. } => ViolationType::LicenceMissing,
            Self::LicenceExpired { .. } => ViolationType::LicenceExpired,
            Self::LicenceInGracePeriod { .. } => ViolationType::LicenceInGracePeriod,
            Self::ThresholdExceeded(_) => ViolationType::ThresholdExceeded,
            Self::ThresholdWarning(_) => ViolationType::ThresholdWarning,
            Self::CustomerIneligible { .. } => ViolationType::CustomerIneligible,
            Self::CustomerLicenceMissing { .. } => ViolationType::CustomerLicenceMissing,
            Self::CrossBorderPermitMissing { .. } => ViolationType::CrossBorderPermitMissing,
        }
    }

    /// Substance context, if the category has one.
    pub fn substance_code(&self) -> Option<&SubstanceCode> {
        match self {
            Self::LicenceMissing { substance_code, .. }
            | Self::LicenceExpired { substance_code, .. }
            | Self::LicenceInGracePeriod { substance_code, .. }
            | Self::CustomerLicenceMissing { substance_code, .. } => Some(substance_code),
            Self::ThresholdExceeded(ctx) | Self::ThresholdWarning(ctx) => ctx.substance_code.as_ref(),
            Self::CustomerIneligible { .. } | Self::CrossBorderPermitMissing { .. } => None,
        }
    }

    /// Licence context, if the category has one.
    pub fn licence_id(&self) -> Option<&LicenceId> {
        match self {
            Self::LicenceInGracePeriod { licence_id, .. } => Some(licence_id),
            Self::LicenceExpired { licence_ids, .. } => licence_ids.first(),
            _ => None,
        }
    }

    /// Threshold context, for threshold categories.
    pub fn threshold(&self) -> Option<&ThresholdContext> {
        match self {
            Self::ThresholdExceeded(ctx) | Self::ThresholdWarning(ctx) => Some(ctx),
            _ => None,
        }
    }
}

/// A compliance finding on a transaction or one of its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Machine-checkable code (e.g. `LICENCE_MISSING`).
    pub code: String,
    /// Line the finding is about; `None` for transaction-level findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    /// Severity.
    pub severity: Severity,
    /// Whether a human override may clear it.
    pub override_eligible: bool,
    /// Human-readable explanation.
    pub message: String,
    /// Category payload.
    pub detail: ViolationDetail,
}

impl Violation {
    /// Build a violation using the category defaults.
    pub fn new(line_number: Option<u32>, detail: ViolationDetail, message: impl Into<String>) -> Self {
        let kind = detail.violation_type();
        let defaults = kind.defaults();
        Self {
            code: kind.code().to_string(),
            line_number,
            severity: defaults.severity,
            override_eligible: defaults.override_eligible,
            message: message.into(),
            detail,
        }
    }

    /// Replace the default override eligibility.
    pub fn with_override_eligible(mut self, eligible: bool) -> Self {
        self.override_eligible = eligible;
        self
    }

    /// Category tag.
    pub fn violation_type(&self) -> ViolationType {
        self.detail.violation_type()
    }

    /// True if the violation blocks the transaction.
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}
