//! # Transaction Validator
//!
//! Judges a transaction against immutable reference data and returns the
//! updated transaction together with the events the caller should publish.
//! The validator performs no I/O; [`ValidationService`](crate::ValidationService)
//! loads the reference data through repositories.
//!
//! ## Procedure
//!
//! Per line, in order:
//!
//! 1. Lines without a resolved substance are uncontrolled.
//! 2. Resolve the classification in force on the transaction date.
//!    Uncontrolled on that date means no licence is required.
//! 3. Match licence coverage (earlier lines reduce period capacity for
//!    later ones).
//! 4. Customers that must hold their own licence need one covering each
//!    narcotics-listed substance.
//! 5. Evaluate per-line threshold rules.
//!
//! Per transaction: cumulative threshold rules, the cross-border permit
//! check and customer qualification.
//!
//! ## Status
//!
//! The status is never set directly. The validator fills in the violation
//! list and `validated_at`, and moves the override workflow to `Pending`
//! when every blocking violation is override-eligible.
//!
//! Evaluation is deterministic: the same transaction and reference data
//! always yield the same lines and violations.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use csc_core::{SubstanceCode, Timestamp};
use csc_registry::{
    Classification, ComplianceEvent, CoverageOutcome, Customer, Direction, EventPayload, Licence,
    NoCoverageReason, OverrideStatus, PermitKind, Substance, ThresholdRule,
    ThresholdWarningRaised, Transaction, TransactionLine, TransactionSummary, ValidationStatus,
    Violation, ViolationDetail,
};
use serde::{Deserialize, Serialize};

use crate::classification::classification_as_of;
use crate::config::EngineConfig;
use crate::coverage::{required_activities, CoverageMatcher, CoverageRequest};
use crate::error::ValidatorError;
use crate::threshold::{scope_matches, ScopeContext, ThresholdEvaluator};
use crate::usage::PeriodUsage;

/// Everything the validator reads, treated as immutable for one pass.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceData<'a> {
    /// Substances referenced by the lines, keyed by code.
    pub substances: &'a BTreeMap<SubstanceCode, Substance>,
    /// Licences held by the transaction's holder.
    pub holder_licences: &'a [Licence],
    /// The counterparty, when the transaction names one.
    pub customer: Option<&'a Customer>,
    /// Licences held by the counterparty.
    pub customer_licences: &'a [Licence],
    /// All threshold rules; inactive ones are skipped.
    pub threshold_rules: &'a [ThresholdRule],
    /// Prior consumption in the current period.
    pub usage: &'a PeriodUsage,
}

/// The result contract returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True if no violation blocks.
    pub is_valid: bool,
    /// All findings, line findings first in line order.
    pub violations: Vec<Violation>,
    /// True if there is a blocking violation and every blocking violation
    /// may be overridden.
    pub override_eligible: bool,
}

impl ValidationResult {
    /// Summarize a validated transaction.
    pub fn of(tx: &Transaction) -> Self {
        Self {
            is_valid: !tx.has_blocking_violations(),
            violations: tx.violations.clone(),
            override_eligible: tx.is_overridable(),
        }
    }

    /// Blocking findings.
    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_blocking())
    }

    /// Non-blocking findings.
    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.is_blocking())
    }
}

/// Updated transaction plus the events to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// The transaction with lines, violations and override state filled in.
    pub transaction: Transaction,
    /// Events in publication order.
    pub events: Vec<ComplianceEvent>,
}

impl ValidationOutcome {
    /// The caller-facing result.
    pub fn result(&self) -> ValidationResult {
        ValidationResult::of(&self.transaction)
    }
}

/// Validated lines and findings, before they are written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Lines with substance, classification, coverage and validity set.
    pub lines: Vec<TransactionLine>,
    /// All findings.
    pub violations: Vec<Violation>,
}

/// Runs the per-line and per-transaction checks.
#[derive(Debug, Clone)]
pub struct TransactionValidator {
    config: EngineConfig,
    thresholds: ThresholdEvaluator,
}

impl TransactionValidator {
    /// A validator with the given engine configuration.
    pub fn new(config: EngineConfig) -> Self {
        let thresholds = ThresholdEvaluator::new(config.default_warning_percent);
        Self { config, thresholds }
    }

    /// The engine configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate `tx` and return the next transaction state plus events.
    ///
    /// A `Failed` transaction may be validated again after remediation;
    /// any pending override cycle is discarded.
    ///
    /// # Errors
    ///
    /// - [`ValidatorError::AlreadyFinal`] for Passed, ApprovedWithOverride
    ///   or RejectedOverride transactions.
    /// - [`ValidatorError::UnknownSubstance`] / [`ValidatorError::UnknownCustomer`]
    ///   when the reference data is incomplete.
    /// - [`ValidatorError::Threshold`] for contractually invalid rules.
    pub fn validate(
        &self,
        tx: Transaction,
        refs: &ReferenceData<'_>,
        at: Timestamp,
    ) -> Result<ValidationOutcome, ValidatorError> {
        let status = tx.status();
        if status.is_final() {
            return Err(ValidatorError::AlreadyFinal { id: tx.id, status });
        }

        let Evaluation { lines, violations } = self.evaluate(&tx, refs)?;
        let mut tx = tx;
        tx.lines = lines;
        tx.violations = violations;
        tx.validated_at = Some(at);
        tx.override_decision = None;
        tx.override_status = if tx.is_overridable() {
            OverrideStatus::Pending
        } else {
            OverrideStatus::None
        };

        let events = events_for(&tx, at);
        let status = tx.status();
        tracing::info!(
            transaction = %tx.id,
            reference = %tx.external_reference,
            %status,
            override_status = %tx.override_status,
            violations = tx.violations.len(),
            "transaction validated"
        );
        Ok(ValidationOutcome {
            transaction: tx,
            events,
        })
    }

    /// Evaluate lines and findings without touching the transaction.
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate), minus the finality check.
    pub fn evaluate(&self, tx: &Transaction, refs: &ReferenceData<'_>) -> Result<Evaluation, ValidatorError> {
        if let Some(customer_id) = &tx.customer_id {
            if refs.customer.map(|c| &c.id) != Some(customer_id) {
                return Err(ValidatorError::UnknownCustomer(customer_id.clone()));
            }
        }

        let date = tx.transaction_date;
        let cross_border = tx.is_cross_border();
        let mut matcher = CoverageMatcher::new(refs.holder_licences, refs.usage, self.config.coverage_tie_break);
        let mut lines = Vec::with_capacity(tx.lines.len());
        let mut violations = Vec::new();
        let mut controlled = Vec::new();

        for line in &tx.lines {
            let mut line = reset_line(line);
            let Some(code) = line.substance_code.clone() else {
                line.coverage = Some(CoverageOutcome::NotRequired);
                lines.push(line);
                continue;
            };
            let substance = refs.substances.get(&code).ok_or_else(|| ValidatorError::UnknownSubstance {
                line_number: line.line_number,
                code: code.clone(),
            })?;

            let classification = classification_as_of(substance, date);
            line.classification = Some(classification);
            if !classification.is_controlled() {
                line.coverage = Some(CoverageOutcome::NotRequired);
                lines.push(line);
                continue;
            }

            let (base_activity, required) =
                required_activities(tx.transaction_type, tx.direction, cross_border, classification);
            let decision = matcher.match_line(&CoverageRequest {
                substance: &code,
                quantity: line.quantity,
                date,
                base_activity,
                required,
            });
            let mut line_violations = coverage_violations(&line, &code, &decision.outcome, decision.grace_period_end);

            if let Some(customer) = refs.customer {
                if customer.category.requires_own_licence()
                    && classification.narcotics.is_listed()
                    && !customer_holds_licence(refs.customer_licences, &code, date)
                {
                    line_violations.push(Violation::new(
                        Some(line.line_number),
                        ViolationDetail::CustomerLicenceMissing {
                            customer_id: customer.id.clone(),
                            substance_code: code.clone(),
                        },
                        format!(
                            "customer {} ({}) holds no valid licence for {code}",
                            customer.id, customer.category
                        ),
                    ));
                }
            }

            let licence_type = covering_licence_type(refs.holder_licences, &decision.outcome);
            let scope = ScopeContext {
                substance_code: Some(&code),
                classification: Some(classification),
                customer: refs.customer,
                licence_type,
            };
            for rule in refs.threshold_rules.iter().filter(|r| r.active && !r.is_cumulative()) {
                if !scope_matches(rule, &scope) {
                    continue;
                }
                let Some(value) = ThresholdEvaluator::line_measure(rule.kind, line.quantity, line.declared_value) else {
                    continue;
                };
                let outcome = self.thresholds.evaluate(rule, value, Some(&code), false)?;
                line_violations.extend(outcome.into_violation(Some(line.line_number)));
            }

            line.coverage = Some(decision.outcome);
            if let Some(first_blocking) = line_violations.iter().find(|v| v.is_blocking()) {
                line.is_valid = false;
                line.error_code = Some(first_blocking.code.clone());
            }
            violations.extend(line_violations);
            controlled.push(ControlledLine {
                index: lines.len(),
                code,
                classification,
                licence_type: licence_type.map(str::to_string),
            });
            lines.push(line);
        }

        violations.extend(self.cumulative_violations(&lines, &controlled, refs)?);
        if !controlled.is_empty() {
            violations.extend(permit_violation(tx, date));
        }
        if let Some(customer) = refs.customer {
            if !customer.is_qualified() {
                violations.push(Violation::new(
                    None,
                    ViolationDetail::CustomerIneligible {
                        customer_id: customer.id.clone(),
                        qualification: customer.qualification,
                    },
                    format!("customer {} is {}, not approved", customer.id, customer.qualification),
                ));
            }
        }

        Ok(Evaluation { lines, violations })
    }

    fn cumulative_violations(
        &self,
        lines: &[TransactionLine],
        controlled: &[ControlledLine],
        refs: &ReferenceData<'_>,
    ) -> Result<Vec<Violation>, ValidatorError> {
        let mut violations = Vec::new();
        for rule in refs.threshold_rules.iter().filter(|r| r.active && r.is_cumulative()) {
            let mut matched = false;
            let mut total = refs.usage.threshold_usage(&rule.id);
            for c in controlled {
                let line = &lines[c.index];
                let scope = ScopeContext {
                    substance_code: Some(&c.code),
                    classification: Some(c.classification),
                    customer: refs.customer,
                    licence_type: c.licence_type.as_deref(),
                };
                if !scope_matches(rule, &scope) {
                    continue;
                }
                if let Some(value) = ThresholdEvaluator::line_measure(rule.kind, line.quantity, line.declared_value) {
                    matched = true;
                    total += value;
                }
            }
            // Prior usage alone is not this transaction's concern.
            if !matched {
                continue;
            }
            let outcome = self
                .thresholds
                .evaluate(rule, total, rule.scope.substance_code.as_ref(), true)?;
            violations.extend(outcome.into_violation(None));
        }
        Ok(violations)
    }
}

impl Default for TransactionValidator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

struct ControlledLine {
    index: usize,
    code: SubstanceCode,
    classification: Classification,
    licence_type: Option<String>,
}

/// Clear results of any earlier validation pass.
fn reset_line(line: &TransactionLine) -> TransactionLine {
    TransactionLine {
        classification: None,
        coverage: None,
        is_valid: true,
        error_code: None,
        ..line.clone()
    }
}

fn coverage_violations(
    line: &TransactionLine,
    code: &SubstanceCode,
    outcome: &CoverageOutcome,
    grace_period_end: Option<NaiveDate>,
) -> Vec<Violation> {
    let line_number = Some(line.line_number);
    match outcome {
        CoverageOutcome::NotRequired => Vec::new(),
        CoverageOutcome::Covered { licence_id, .. } => match grace_period_end {
            Some(end) => vec![Violation::new(
                line_number,
                ViolationDetail::LicenceInGracePeriod {
                    substance_code: code.clone(),
                    licence_id: licence_id.clone(),
                    grace_period_end: end,
                },
                format!("licence {licence_id} covers {code} only through its grace period ending {end}"),
            )],
            None => Vec::new(),
        },
        CoverageOutcome::NotCovered { reason } => {
            let violation = match reason {
                NoCoverageReason::Expired { licence_ids } => Violation::new(
                    line_number,
                    ViolationDetail::LicenceExpired {
                        substance_code: code.clone(),
                        licence_ids: licence_ids.clone(),
                    },
                    format!("every licence for {code} has expired"),
                ),
                NoCoverageReason::CapacityExceeded { licence_ids } => Violation::new(
                    line_number,
                    ViolationDetail::LicenceMissing {
                        substance_code: code.clone(),
                        capacity_exhausted: licence_ids.clone(),
                    },
                    format!("no licence has capacity left for {} of {code}", line.quantity),
                ),
                NoCoverageReason::NoLicence => Violation::new(
                    line_number,
                    ViolationDetail::LicenceMissing {
                        substance_code: code.clone(),
                        capacity_exhausted: Vec::new(),
                    },
                    format!("no licence covers {code}"),
                ),
            };
            vec![violation]
        }
    }
}

fn covering_licence_type<'a>(licences: &'a [Licence], outcome: &CoverageOutcome) -> Option<&'a str> {
    match outcome {
        CoverageOutcome::Covered { licence_id, .. } => licences
            .iter()
            .find(|l| l.id == *licence_id)
            .map(|l| l.licence_type.as_str()),
        _ => None,
    }
}

fn customer_holds_licence(licences: &[Licence], code: &SubstanceCode, date: NaiveDate) -> bool {
    licences.iter().any(|licence| {
        licence.validity_on(date).is_effectively_valid()
            && licence.mappings_for(code).any(|m| licence.mapping_in_window(m, date))
    })
}

fn permit_violation(tx: &Transaction, date: NaiveDate) -> Option<Violation> {
    if !tx.is_cross_border() {
        return None;
    }
    let required = match tx.direction {
        Direction::Inbound => PermitKind::Import,
        Direction::Outbound => PermitKind::Export,
        Direction::Internal => return None,
    };
    let present = tx
        .permits
        .iter()
        .any(|p| p.kind == required && p.valid_on(date));
    if present {
        return None;
    }
    Some(Violation::new(
        None,
        ViolationDetail::CrossBorderPermitMissing {
            required,
            origin: tx.origin_country.clone(),
            destination: tx.destination_country.clone(),
        },
        format!(
            "{} from {} to {} requires a valid {required} permit",
            tx.direction, tx.origin_country, tx.destination_country
        ),
    ))
}

fn events_for(tx: &Transaction, at: Timestamp) -> Vec<ComplianceEvent> {
    let summary = TransactionSummary::of(tx);
    let mut events = Vec::new();
    match tx.status() {
        ValidationStatus::Passed => {
            events.push(ComplianceEvent::new(EventPayload::TransactionPassed(summary), at));
        }
        ValidationStatus::Failed => {
            events.push(ComplianceEvent::new(
                EventPayload::TransactionBlocked(summary.clone()),
                at,
            ));
            if tx.override_status == OverrideStatus::Pending {
                events.push(ComplianceEvent::new(EventPayload::OverrideRequested(summary), at));
            }
        }
        ValidationStatus::Pending
        | ValidationStatus::ApprovedWithOverride
        | ValidationStatus::RejectedOverride => {}
    }
    for violation in &tx.violations {
        if let ViolationDetail::ThresholdWarning(ctx) = &violation.detail {
            events.push(ComplianceEvent::new(
                EventPayload::ThresholdWarning(ThresholdWarningRaised {
                    transaction_id: tx.id,
                    line_number: violation.line_number,
                    threshold: ctx.clone(),
                }),
                at,
            ));
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use csc_core::{CountryCode, CustomerId, LicenceId, ThresholdRuleId};
    use csc_registry::{
        Activity, ActivitySet, BaseUnit, CustomerCategory, EventType, HolderRef, LicenceStatus,
        NarcoticsList, PeriodKind, QualificationStatus, ReclassificationEvent,
        ReclassificationStatus, Severity, SubstanceMapping, ThresholdKind, ThresholdScope,
        TransactionType, TransportPermit, ViolationType,
    };
    use csc_core::ReclassificationId;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn code(s: &str) -> SubstanceCode {
        SubstanceCode::new(s).unwrap()
    }

    fn substances() -> BTreeMap<SubstanceCode, Substance> {
        let mut map = BTreeMap::new();
        map.insert(
            code("MORPHINE"),
            Substance::new(code("MORPHINE"), "Morphine", Classification::narcotic(NarcoticsList::II)),
        );
        map
    }

    fn company_licence(id: &str) -> Licence {
        Licence {
            id: LicenceId::new(id).unwrap(),
            holder: HolderRef::Company,
            issuing_authority: "Farmatec".to_string(),
            licence_type: "opium_act".to_string(),
            licence_number: id.to_string(),
            issue_date: date(2024, 1, 1),
            expiry_date: Some(date(2027, 12, 31)),
            grace_period_end: None,
            status: LicenceStatus::Valid,
            activities: ActivitySet::empty()
                .with(Activity::Distribute)
                .with(Activity::Possess)
                .with(Activity::Export),
            mappings: vec![SubstanceMapping::unrestricted(code("MORPHINE"))],
        }
    }

    fn customer(qualification: QualificationStatus, category: CustomerCategory) -> Customer {
        Customer {
            id: CustomerId::new("C-1").unwrap(),
            name: "Apotheek Centraal".to_string(),
            category,
            country: CountryCode::new("NL").unwrap(),
            qualification,
        }
    }

    fn rule(limit: i64) -> ThresholdRule {
        ThresholdRule {
            id: ThresholdRuleId::new("T-MORPHINE").unwrap(),
            name: "Morphine per line".to_string(),
            kind: ThresholdKind::Quantity,
            scope: ThresholdScope {
                substance_code: Some(code("MORPHINE")),
                ..ThresholdScope::default()
            },
            limit: Decimal::from(limit),
            unit: "g".to_string(),
            warning_percent: Some(Decimal::from(80)),
            allow_override: false,
            max_override_percent: None,
            period: None,
            active: true,
        }
    }

    fn transaction(quantity: i64) -> Transaction {
        let mut line = TransactionLine::new(1, "SKU-MORPH-10", Decimal::from(quantity), BaseUnit::Gram);
        line.substance_code = Some(code("MORPHINE"));
        Transaction {
            id: csc_core::TransactionId::new(),
            external_reference: "SO-1001".to_string(),
            transaction_type: TransactionType::Order,
            direction: Direction::Outbound,
            holder: HolderRef::Company,
            customer_id: None,
            origin_country: CountryCode::new("NL").unwrap(),
            destination_country: CountryCode::new("NL").unwrap(),
            transaction_date: date(2025, 12, 15),
            permits: Vec::new(),
            lines: vec![line],
            violations: Vec::new(),
            validated_at: None,
            override_status: OverrideStatus::None,
            override_decision: None,
        }
    }

    struct Fixture {
        substances: BTreeMap<SubstanceCode, Substance>,
        licences: Vec<Licence>,
        customer: Option<Customer>,
        customer_licences: Vec<Licence>,
        rules: Vec<ThresholdRule>,
        usage: PeriodUsage,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                substances: substances(),
                licences: vec![company_licence("OW-1")],
                customer: None,
                customer_licences: Vec::new(),
                rules: vec![rule(100)],
                usage: PeriodUsage::none(),
            }
        }

        fn refs(&self) -> ReferenceData<'_> {
            ReferenceData {
                substances: &self.substances,
                holder_licences: &self.licences,
                customer: self.customer.as_ref(),
                customer_licences: &self.customer_licences,
                threshold_rules: &self.rules,
                usage: &self.usage,
            }
        }
    }

    fn validate(fx: &Fixture, tx: Transaction) -> ValidationOutcome {
        TransactionValidator::default()
            .validate(tx, &fx.refs(), Timestamp::now())
            .unwrap()
    }

    #[test]
    fn clean_transaction_passes() {
        let fx = Fixture::new();
        let out = validate(&fx, transaction(10));
        assert_eq!(out.transaction.status(), ValidationStatus::Passed);
        assert!(out.result().is_valid);
        assert!(matches!(
            out.transaction.lines[0].coverage,
            Some(CoverageOutcome::Covered { .. })
        ));
        let types: Vec<_> = out.events.iter().map(ComplianceEvent::event_type).collect();
        assert_eq!(types, vec![EventType::TransactionPassed]);
    }

    #[test]
    fn threshold_warning_only_at_95() {
        let fx = Fixture::new();
        let out = validate(&fx, transaction(95));
        assert_eq!(out.transaction.status(), ValidationStatus::Passed);
        let result = out.result();
        assert_eq!(result.errors().count(), 0);
        let warnings: Vec<_> = result.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].violation_type(), ViolationType::ThresholdWarning);
        let types: Vec<_> = out.events.iter().map(ComplianceEvent::event_type).collect();
        assert_eq!(types, vec![EventType::TransactionPassed, EventType::ThresholdWarning]);
    }

    #[test]
    fn threshold_breach_at_101_is_not_overridable() {
        let fx = Fixture::new();
        let out = validate(&fx, transaction(101));
        let tx = &out.transaction;
        assert_eq!(tx.status(), ValidationStatus::Failed);
        assert_eq!(tx.override_status, OverrideStatus::None);
        let errors: Vec<_> = tx.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, Severity::Critical);
        assert!(!errors[0].override_eligible);
        assert!(!tx.lines[0].is_valid);
        assert_eq!(tx.lines[0].error_code.as_deref(), Some("THRESHOLD_EXCEEDED"));
        let types: Vec<_> = out.events.iter().map(ComplianceEvent::event_type).collect();
        assert_eq!(types, vec![EventType::TransactionBlocked]);
    }

    #[test]
    fn overridable_breach_moves_override_to_pending() {
        let mut fx = Fixture::new();
        fx.rules[0].allow_override = true;
        let out = validate(&fx, transaction(120));
        assert_eq!(out.transaction.override_status, OverrideStatus::Pending);
        assert!(out.result().override_eligible);
        let types: Vec<_> = out.events.iter().map(ComplianceEvent::event_type).collect();
        assert_eq!(
            types,
            vec![EventType::TransactionBlocked, EventType::OverrideRequested]
        );
    }

    #[test]
    fn reclassified_substance_is_judged_as_of_transaction_date() {
        let mut fx = Fixture::new();
        let morphine = fx.substances.get_mut(&code("MORPHINE")).unwrap();
        morphine.classification = Classification::narcotic(NarcoticsList::I);
        morphine.reclassifications.push(ReclassificationEvent {
            id: ReclassificationId::new(),
            previous: Classification::narcotic(NarcoticsList::II),
            new: Classification::narcotic(NarcoticsList::I),
            effective_date: date(2026, 1, 1),
            status: ReclassificationStatus::Completed,
            regulatory_reference: None,
        });
        let out = validate(&fx, transaction(10));
        assert_eq!(
            out.transaction.lines[0].classification,
            Some(Classification::narcotic(NarcoticsList::II))
        );
    }

    #[test]
    fn uncontrolled_lines_need_no_licence() {
        let mut fx = Fixture::new();
        fx.licences.clear();
        let mut tx = transaction(10);
        tx.lines[0].substance_code = None;
        let out = validate(&fx, tx);
        assert_eq!(out.transaction.status(), ValidationStatus::Passed);
        assert_eq!(out.transaction.lines[0].coverage, Some(CoverageOutcome::NotRequired));
    }

    #[test]
    fn missing_licence_blocks_without_override() {
        let mut fx = Fixture::new();
        fx.licences.clear();
        let out = validate(&fx, transaction(10));
        let tx = &out.transaction;
        assert_eq!(tx.status(), ValidationStatus::Failed);
        assert_eq!(tx.lines[0].error_code.as_deref(), Some("LICENCE_MISSING"));
        assert!(!tx.is_overridable());
    }

    #[test]
    fn expired_licence_reports_licence_expired() {
        let mut fx = Fixture::new();
        fx.licences[0].expiry_date = Some(date(2025, 6, 30));
        let out = validate(&fx, transaction(10));
        assert_eq!(
            out.transaction.lines[0].error_code.as_deref(),
            Some("LICENCE_EXPIRED")
        );
    }

    #[test]
    fn grace_period_adds_warning() {
        let mut fx = Fixture::new();
        fx.licences[0].expiry_date = Some(date(2025, 11, 30));
        fx.licences[0].grace_period_end = Some(date(2026, 1, 31));
        let out = validate(&fx, transaction(10));
        assert_eq!(out.transaction.status(), ValidationStatus::Passed);
        assert!(out
            .transaction
            .warnings()
            .any(|v| v.violation_type() == ViolationType::LicenceInGracePeriod));
    }

    #[test]
    fn mapping_ending_with_licence_is_carried_through_grace() {
        let mut fx = Fixture::new();
        fx.licences[0].expiry_date = Some(date(2025, 11, 30));
        fx.licences[0].grace_period_end = Some(date(2026, 1, 31));
        fx.licences[0].mappings[0].expiry_date = Some(date(2025, 11, 30));
        let out = validate(&fx, transaction(10));
        assert_eq!(out.transaction.status(), ValidationStatus::Passed);
        assert!(out
            .transaction
            .warnings()
            .any(|v| v.violation_type() == ViolationType::LicenceInGracePeriod));
    }

    #[test]
    fn cross_border_export_requires_permit() {
        let fx = Fixture::new();
        let mut tx = transaction(10);
        tx.destination_country = CountryCode::new("BE").unwrap();
        let out = validate(&fx, tx.clone());
        assert!(out
            .transaction
            .errors()
            .any(|v| v.violation_type() == ViolationType::CrossBorderPermitMissing));
        assert!(!out.transaction.is_overridable());

        tx.permits.push(TransportPermit {
            kind: PermitKind::Export,
            number: "EX-77".to_string(),
            valid_from: None,
            valid_until: date(2025, 12, 31),
        });
        let out = validate(&fx, tx);
        assert_eq!(out.transaction.status(), ValidationStatus::Passed);
    }

    #[test]
    fn unqualified_customer_is_overridable() {
        let mut fx = Fixture::new();
        fx.customer = Some(customer(QualificationStatus::Pending, CustomerCategory::Research));
        let mut tx = transaction(10);
        tx.customer_id = Some(CustomerId::new("C-1").unwrap());
        let out = validate(&fx, tx);
        assert_eq!(out.transaction.status(), ValidationStatus::Failed);
        assert_eq!(out.transaction.override_status, OverrideStatus::Pending);
    }

    #[test]
    fn licensed_category_customer_needs_own_licence() {
        let mut fx = Fixture::new();
        fx.customer = Some(customer(QualificationStatus::Approved, CustomerCategory::Pharmacy));
        let mut tx = transaction(10);
        tx.customer_id = Some(CustomerId::new("C-1").unwrap());
        let out = validate(&fx, tx.clone());
        assert_eq!(
            out.transaction.lines[0].error_code.as_deref(),
            Some("CUSTOMER_LICENCE_MISSING")
        );

        let mut own = company_licence("CUST-OW-1");
        own.holder = HolderRef::Customer(CustomerId::new("C-1").unwrap());
        fx.customer_licences.push(own);
        let out = validate(&fx, tx);
        assert_eq!(out.transaction.status(), ValidationStatus::Passed);
    }

    #[test]
    fn unknown_references_are_errors_not_violations() {
        let fx = Fixture::new();
        let mut tx = transaction(10);
        tx.customer_id = Some(CustomerId::new("C-404").unwrap());
        assert!(matches!(
            TransactionValidator::default().validate(tx, &fx.refs(), Timestamp::now()),
            Err(ValidatorError::UnknownCustomer(_))
        ));

        let mut tx = transaction(10);
        tx.lines[0].substance_code = Some(code("FENTANYL"));
        assert!(matches!(
            TransactionValidator::default().validate(tx, &fx.refs(), Timestamp::now()),
            Err(ValidatorError::UnknownSubstance { line_number: 1, .. })
        ));
    }

    #[test]
    fn cumulative_rule_adds_prior_usage_at_transaction_level() {
        let mut fx = Fixture::new();
        let mut monthly = rule(500);
        monthly.id = ThresholdRuleId::new("T-MONTHLY").unwrap();
        monthly.name = "Morphine per month".to_string();
        monthly.period = Some(PeriodKind::Monthly);
        fx.rules = vec![monthly];
        fx.usage = PeriodUsage::none().with_threshold(ThresholdRuleId::new("T-MONTHLY").unwrap(), Decimal::from(450));
        let out = validate(&fx, transaction(60));
        let breach = out
            .transaction
            .errors()
            .find(|v| v.violation_type() == ViolationType::ThresholdExceeded)
            .unwrap();
        assert_eq!(breach.line_number, None);
        let ctx = breach.detail.threshold().unwrap();
        assert_eq!(ctx.value, Decimal::from(510));
        assert!(ctx.cumulative);
    }

    #[test]
    fn every_rule_is_reported() {
        let mut fx = Fixture::new();
        let mut second = rule(50);
        second.id = ThresholdRuleId::new("T-STRICT").unwrap();
        fx.rules.push(second);
        let out = validate(&fx, transaction(101));
        assert_eq!(
            out.transaction
                .errors()
                .filter(|v| v.violation_type() == ViolationType::ThresholdExceeded)
                .count(),
            2
        );
    }

    #[test]
    fn revalidation_is_idempotent_and_final_states_refuse() {
        let mut fx = Fixture::new();
        fx.licences.clear();
        let validator = TransactionValidator::default();
        let first = validator.validate(transaction(10), &fx.refs(), Timestamp::now()).unwrap();
        let second = validator
            .validate(first.transaction.clone(), &fx.refs(), Timestamp::now())
            .unwrap();
        assert_eq!(first.transaction.violations, second.transaction.violations);
        assert_eq!(first.transaction.lines, second.transaction.lines);
        assert_eq!(first.transaction.status(), second.transaction.status());

        let fx = Fixture::new();
        let passed = validator.validate(transaction(10), &fx.refs(), Timestamp::now()).unwrap();
        assert!(matches!(
            validator.validate(passed.transaction, &fx.refs(), Timestamp::now()),
            Err(ValidatorError::AlreadyFinal {
                status: ValidationStatus::Passed,
                ..
            })
        ));
    }
}
