//! # Threshold Evaluation
//!
//! Evaluates a value against one [`ThresholdRule`]:
//!
//! ```text
//!   value > limit                          → breach  (critical)
//!   limit × warn% / 100 ≤ value ≤ limit    → warning (non-blocking)
//!   otherwise                              → clear
//! ```
//!
//! A breach is override-eligible exactly when the rule allows overrides.
//! The override ceiling (`limit × maxOverride% / 100`) is carried on the
//! violation context; whether a breach above it may still be approved is
//! decided by the [`OverrideGate`](crate::OverrideGate), not here.
//!
//! The evaluator never short-circuits: callers evaluate every applicable
//! rule and collect all findings.

use csc_core::SubstanceCode;
use csc_registry::{
    Classification, Customer, ThresholdContext, ThresholdKind, ThresholdRule, Violation,
    ViolationDetail,
};
use rust_decimal::Decimal;

use crate::error::ThresholdError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Line and transaction attributes a rule scope is matched against.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeContext<'a> {
    /// Resolved substance of the line.
    pub substance_code: Option<&'a SubstanceCode>,
    /// Classification in force on the transaction date.
    pub classification: Option<Classification>,
    /// Counterparty.
    pub customer: Option<&'a Customer>,
    /// Licence type of the covering licence.
    pub licence_type: Option<&'a str>,
}

/// True if every field set on the rule's scope matches `ctx`.
///
/// A scope field the context cannot answer (no customer, uncovered line)
/// does not match.
pub fn scope_matches(rule: &ThresholdRule, ctx: &ScopeContext<'_>) -> bool {
    let scope = &rule.scope;
    if let Some(code) = &scope.substance_code {
        if ctx.substance_code != Some(code) {
            return false;
        }
    }
    if let Some(list) = scope.narcotics_list {
        if ctx.classification.map(|c| c.narcotics) != Some(list) {
            return false;
        }
    }
    if let Some(category) = scope.precursor_category {
        if ctx.classification.map(|c| c.precursor) != Some(category) {
            return false;
        }
    }
    if let Some(category) = scope.customer_category {
        if ctx.customer.map(|c| c.category) != Some(category) {
            return false;
        }
    }
    if let Some(id) = &scope.customer_id {
        if ctx.customer.map(|c| &c.id) != Some(id) {
            return false;
        }
    }
    if let Some(licence_type) = &scope.licence_type {
        if ctx.licence_type != Some(licence_type.as_str()) {
            return false;
        }
    }
    true
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdOutcome {
    /// Below the warning level.
    Clear,
    /// At or above the warning level, not above the limit.
    Warning(ThresholdContext),
    /// Above the limit.
    Breach {
        /// Evaluation context.
        context: ThresholdContext,
        /// Copied from the rule's `allow_override`.
        override_eligible: bool,
    },
}

impl ThresholdOutcome {
    /// The violation this outcome produces, if any.
    pub fn into_violation(self, line_number: Option<u32>) -> Option<Violation> {
        match self {
            Self::Clear => None,
            Self::Warning(ctx) => {
                let message = format!(
                    "{}: {} {} reaches warning level {} {} (limit {} {})",
                    ctx.rule_name, ctx.value, ctx.unit, ctx.warning_level, ctx.unit, ctx.limit, ctx.unit
                );
                Some(Violation::new(
                    line_number,
                    ViolationDetail::ThresholdWarning(ctx),
                    message,
                ))
            }
            Self::Breach {
                context,
                override_eligible,
            } => {
                let message = format!(
                    "{}: {} {} exceeds limit {} {}",
                    context.rule_name, context.value, context.unit, context.limit, context.unit
                );
                Some(
                    Violation::new(
                        line_number,
                        ViolationDetail::ThresholdExceeded(context),
                        message,
                    )
                    .with_override_eligible(override_eligible),
                )
            }
        }
    }
}

/// Evaluates values against threshold rules.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEvaluator {
    default_warning_percent: Decimal,
}

impl ThresholdEvaluator {
    /// An evaluator applying `default_warning_percent` to rules without their own.
    pub fn new(default_warning_percent: Decimal) -> Self {
        Self {
            default_warning_percent,
        }
    }

    /// The value a per-line rule measures on a line, or `None` when the
    /// line carries nothing to measure (a value rule without a declared value).
    pub fn line_measure(kind: ThresholdKind, quantity: Decimal, declared_value: Option<Decimal>) -> Option<Decimal> {
        match kind {
            ThresholdKind::Quantity => Some(quantity),
            ThresholdKind::Frequency => Some(Decimal::ONE),
            ThresholdKind::Value => declared_value,
        }
    }

    /// Evaluate `value` against `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdError`] for a negative limit or percentage on the
    /// rule, or a negative engine default.
    pub fn evaluate(
        &self,
        rule: &ThresholdRule,
        value: Decimal,
        substance_code: Option<&SubstanceCode>,
        cumulative: bool,
    ) -> Result<ThresholdOutcome, ThresholdError> {
        rule.validate()?;
        if self.default_warning_percent.is_sign_negative() && !self.default_warning_percent.is_zero() {
            return Err(ThresholdError::NegativeDefaultWarning(
                self.default_warning_percent,
            ));
        }

        let warning_percent = rule.warning_percent.unwrap_or(self.default_warning_percent);
        let warning_level = rule.limit * warning_percent / HUNDRED;
        let override_ceiling = rule
            .max_override_percent
            .map(|percent| rule.limit * percent / HUNDRED);

        let context = ThresholdContext {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            kind: rule.kind,
            substance_code: substance_code.cloned(),
            value,
            limit: rule.limit,
            warning_level,
            override_ceiling,
            unit: rule.unit.clone(),
            cumulative,
        };

        let outcome = if value > rule.limit {
            tracing::debug!(
                rule = %rule.id,
                %value,
                limit = %rule.limit,
                allow_override = rule.allow_override,
                "threshold breached"
            );
            ThresholdOutcome::Breach {
                context,
                override_eligible: rule.allow_override,
            }
        } else if value >= warning_level {
            tracing::debug!(rule = %rule.id, %value, %warning_level, "threshold warning level reached");
            ThresholdOutcome::Warning(context)
        } else {
            ThresholdOutcome::Clear
        };
        Ok(outcome)
    }
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        Self::new(Decimal::from(crate::config::DEFAULT_WARNING_PERCENT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csc_core::{CountryCode, CustomerId, ThresholdRuleId};
    use csc_registry::{
        CustomerCategory, NarcoticsList, QualificationStatus, Severity, ThresholdScope,
    };

    fn rule(limit: i64) -> ThresholdRule {
        ThresholdRule {
            id: ThresholdRuleId::new("T-MORPHINE").unwrap(),
            name: "Morphine per line".to_string(),
            kind: ThresholdKind::Quantity,
            scope: ThresholdScope::default(),
            limit: Decimal::from(limit),
            unit: "g".to_string(),
            warning_percent: Some(Decimal::from(80)),
            allow_override: false,
            max_override_percent: None,
            period: None,
            active: true,
        }
    }

    fn eval(rule: &ThresholdRule, value: i64) -> ThresholdOutcome {
        ThresholdEvaluator::default()
            .evaluate(rule, Decimal::from(value), None, false)
            .unwrap()
    }

    #[test]
    fn warning_band_is_inclusive() {
        let r = rule(100);
        assert_eq!(eval(&r, 79), ThresholdOutcome::Clear);
        assert!(matches!(eval(&r, 80), ThresholdOutcome::Warning(_)));
        assert!(matches!(eval(&r, 95), ThresholdOutcome::Warning(_)));
        assert!(matches!(eval(&r, 100), ThresholdOutcome::Warning(_)));
        assert!(matches!(eval(&r, 101), ThresholdOutcome::Breach { .. }));
    }

    #[test]
    fn breach_violation_is_critical_and_follows_rule_override() {
        let mut r = rule(100);
        let v = eval(&r, 101).into_violation(Some(1)).unwrap();
        assert_eq!(v.severity, Severity::Critical);
        assert!(!v.override_eligible);
        assert_eq!(v.code, "THRESHOLD_EXCEEDED");

        r.allow_override = true;
        let v = eval(&r, 101).into_violation(Some(1)).unwrap();
        assert!(v.override_eligible);
    }

    #[test]
    fn warning_violation_is_not_blocking() {
        let v = eval(&rule(100), 95).into_violation(Some(2)).unwrap();
        assert_eq!(v.severity, Severity::Warning);
        assert!(!v.is_blocking());
        assert_eq!(v.line_number, Some(2));
    }

    #[test]
    fn default_warning_percent_applies() {
        let mut r = rule(200);
        r.warning_percent = None;
        let evaluator = ThresholdEvaluator::new(Decimal::from(50));
        let outcome = evaluator.evaluate(&r, Decimal::from(100), None, false).unwrap();
        match outcome {
            ThresholdOutcome::Warning(ctx) => assert_eq!(ctx.warning_level, Decimal::from(100)),
            other => panic!("expected warning, got {other:?}"),
        }
    }

    #[test]
    fn ceiling_is_carried_on_context() {
        let mut r = rule(100);
        r.allow_override = true;
        r.max_override_percent = Some(Decimal::from(150));
        match eval(&r, 160) {
            ThresholdOutcome::Breach { context, .. } => {
                assert_eq!(context.override_ceiling, Some(Decimal::from(150)));
                assert!(context.exceeds_override_ceiling());
            }
            other => panic!("expected breach, got {other:?}"),
        }
        match eval(&r, 140) {
            ThresholdOutcome::Breach { context, .. } => assert!(!context.exceeds_override_ceiling()),
            other => panic!("expected breach, got {other:?}"),
        }
    }

    #[test]
    fn negative_inputs_are_contract_errors() {
        let mut r = rule(-1);
        let evaluator = ThresholdEvaluator::default();
        assert!(matches!(
            evaluator.evaluate(&r, Decimal::ONE, None, false),
            Err(ThresholdError::InvalidRule(_))
        ));
        r.limit = Decimal::from(100);
        r.warning_percent = None;
        let negative = ThresholdEvaluator::new(Decimal::from(-5));
        assert!(matches!(
            negative.evaluate(&r, Decimal::ONE, None, false),
            Err(ThresholdError::NegativeDefaultWarning(_))
        ));
    }

    #[test]
    fn line_measures() {
        let q = Decimal::from(7);
        assert_eq!(ThresholdEvaluator::line_measure(ThresholdKind::Quantity, q, None), Some(q));
        assert_eq!(
            ThresholdEvaluator::line_measure(ThresholdKind::Frequency, q, None),
            Some(Decimal::ONE)
        );
        assert_eq!(ThresholdEvaluator::line_measure(ThresholdKind::Value, q, None), None);
    }

    #[test]
    fn scope_requires_every_set_field() {
        let morphine = SubstanceCode::new("MORPHINE").unwrap();
        let customer = Customer {
            id: CustomerId::new("C-1").unwrap(),
            name: "Apotheek Centraal".to_string(),
            category: CustomerCategory::Pharmacy,
            country: CountryCode::new("NL").unwrap(),
            qualification: QualificationStatus::Approved,
        };
        let ctx = ScopeContext {
            substance_code: Some(&morphine),
            classification: Some(Classification::narcotic(NarcoticsList::II)),
            customer: Some(&customer),
            licence_type: None,
        };

        let mut r = rule(100);
        assert!(scope_matches(&r, &ctx));

        r.scope.substance_code = Some(morphine.clone());
        r.scope.narcotics_list = Some(NarcoticsList::II);
        r.scope.customer_category = Some(CustomerCategory::Pharmacy);
        assert!(scope_matches(&r, &ctx));

        r.scope.narcotics_list = Some(NarcoticsList::I);
        assert!(!scope_matches(&r, &ctx));

        r.scope.narcotics_list = None;
        r.scope.licence_type = Some("opium_act".to_string());
        assert!(!scope_matches(&r, &ctx), "uncovered line cannot match a licence-type scope");

        let no_customer = ScopeContext {
            customer: None,
            ..ctx
        };
        r.scope.licence_type = None;
        assert!(!scope_matches(&r, &no_customer));
    }
}
