//! # Coverage Caps and Threshold Boundaries
//!
//! - A line larger than every candidate's per-transaction cap is never
//!   partially covered
//! - Threshold limits are strict: exactly at the limit is not a breach
//! - Exactly at the warning level is a warning
//! - The 95 g / 101 g scenario against a 100 g rule with an 80 % warning

use std::sync::Arc;

use chrono::NaiveDate;
use csc_compliance::{
    CoverageMatcher, CoverageRequest, CoverageTieBreak, EngineConfig, PeriodUsage, Repositories,
    ThresholdEvaluator, ThresholdOutcome, ValidationService,
};
use csc_core::{CountryCode, LicenceId, SubstanceCode, ThresholdRuleId, Timestamp};
use csc_registry::{
    Activity, ActivitySet, BaseUnit, Classification, CoverageOutcome, Direction, HolderRef, Licence,
    LicenceStatus, MemoryRegistry, NarcoticsList, NoCoverageReason, OverrideStatus, Severity,
    Substance, SubstanceMapping, ThresholdKind, ThresholdRule, ThresholdScope, Transaction,
    TransactionLine, TransactionType, ValidationStatus, ViolationDetail, ViolationType,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn morphine() -> SubstanceCode {
    SubstanceCode::new("MORPHINE").unwrap()
}

fn capped_licence(id: &str, cap: Option<i64>) -> Licence {
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
        activities: ActivitySet::empty().with(Activity::Distribute),
        mappings: vec![SubstanceMapping {
            max_per_transaction: cap.map(Decimal::from),
            ..SubstanceMapping::unrestricted(morphine())
        }],
    }
}

fn rule(allow_override: bool) -> ThresholdRule {
    ThresholdRule {
        id: ThresholdRuleId::new("T-MORPH-LINE").unwrap(),
        name: "Morphine per line".to_string(),
        kind: ThresholdKind::Quantity,
        scope: ThresholdScope {
            substance_code: Some(morphine()),
            ..ThresholdScope::default()
        },
        limit: Decimal::from(100),
        unit: "g".to_string(),
        warning_percent: Some(Decimal::from(80)),
        allow_override,
        max_override_percent: None,
        period: None,
        active: true,
    }
}

fn transaction(grams: &str) -> Transaction {
    Transaction {
        id: csc_core::TransactionId::new(),
        external_reference: "SO-2001".to_string(),
        transaction_type: TransactionType::Order,
        direction: Direction::Outbound,
        holder: HolderRef::Company,
        customer_id: None,
        origin_country: CountryCode::new("NL").unwrap(),
        destination_country: CountryCode::new("NL").unwrap(),
        transaction_date: date(2025, 12, 15),
        permits: Vec::new(),
        lines: vec![TransactionLine::new(
            1,
            "SKU-MORPH-10",
            grams.parse().unwrap(),
            BaseUnit::Gram,
        )],
        violations: Vec::new(),
        validated_at: None,
        override_status: OverrideStatus::None,
        override_decision: None,
    }
}

fn service(licences: Vec<Licence>, rules: Vec<ThresholdRule>) -> ValidationService {
    let registry = MemoryRegistry::new();
    registry.insert_product("SKU-MORPH-10", Some(morphine()));
    registry.insert_substance(Substance::new(
        morphine(),
        "Morphine",
        Classification::narcotic(NarcoticsList::II),
    ));
    for licence in licences {
        registry.insert_licence(licence);
    }
    for rule in rules {
        registry.insert_threshold_rule(rule);
    }
    ValidationService::new(Repositories::from_shared(Arc::new(registry)), EngineConfig::default())
}

// ---------------------------------------------------------------------------
// 1. Per-transaction caps
// ---------------------------------------------------------------------------

#[test]
fn line_above_every_cap_is_not_covered() {
    let svc = service(
        vec![capped_licence("OW-A", Some(50)), capped_licence("OW-B", Some(80))],
        Vec::new(),
    );
    let outcome = svc
        .validate(transaction("100"), &PeriodUsage::none(), Timestamp::now())
        .unwrap();
    let tx = &outcome.transaction;

    match &tx.lines[0].coverage {
        Some(CoverageOutcome::NotCovered {
            reason: NoCoverageReason::CapacityExceeded { licence_ids },
        }) => assert_eq!(licence_ids.len(), 2),
        other => panic!("expected capacity exhaustion, got {other:?}"),
    }
    assert_eq!(tx.status(), ValidationStatus::Failed);
    let errors: Vec<_> = tx.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].violation_type(), ViolationType::LicenceMissing);
    assert!(matches!(
        &errors[0].detail,
        ViolationDetail::LicenceMissing { capacity_exhausted, .. } if capacity_exhausted.len() == 2
    ));
    assert!(!tx.is_overridable());
}

#[test]
fn uncapped_licence_still_covers() {
    let svc = service(
        vec![capped_licence("OW-A", Some(50)), capped_licence("OW-Z", None)],
        Vec::new(),
    );
    let outcome = svc
        .validate(transaction("100"), &PeriodUsage::none(), Timestamp::now())
        .unwrap();
    match &outcome.transaction.lines[0].coverage {
        Some(CoverageOutcome::Covered { licence_id, consumed, .. }) => {
            assert_eq!(licence_id.as_str(), "OW-Z");
            assert_eq!(*consumed, Decimal::from(100));
        }
        other => panic!("expected coverage, got {other:?}"),
    }
}

proptest! {
    #[test]
    fn never_partially_covered(
        caps in proptest::collection::vec(1i64..500, 1..5),
        excess in 1i64..100,
    ) {
        let licences: Vec<Licence> = caps
            .iter()
            .enumerate()
            .map(|(i, cap)| capped_licence(&format!("OW-{i}"), Some(*cap)))
            .collect();
        let quantity = Decimal::from(caps.iter().copied().max().unwrap_or(0) + excess);
        let usage = PeriodUsage::none();
        let mut matcher = CoverageMatcher::new(&licences, &usage, CoverageTieBreak::LicenceId);
        let code = morphine();
        let decision = matcher.match_line(&CoverageRequest {
            substance: &code,
            quantity,
            date: date(2025, 12, 15),
            base_activity: Activity::Distribute,
            required: ActivitySet::empty().with(Activity::Distribute),
        });
        let not_covered = matches!(decision.outcome, CoverageOutcome::NotCovered { .. });
        prop_assert!(not_covered);
        for licence in &licences {
            prop_assert_eq!(matcher.allocated(&licence.id, &code), Decimal::ZERO);
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Threshold boundaries
// ---------------------------------------------------------------------------

#[test]
fn exactly_at_limit_is_a_warning_not_a_breach() {
    let evaluator = ThresholdEvaluator::default();
    let code = morphine();
    let outcome = evaluator
        .evaluate(&rule(false), Decimal::from(100), Some(&code), false)
        .unwrap();
    assert!(matches!(outcome, ThresholdOutcome::Warning(_)));
}

#[test]
fn exactly_at_warning_level_is_a_warning() {
    let evaluator = ThresholdEvaluator::default();
    let code = morphine();
    let at = evaluator
        .evaluate(&rule(false), Decimal::from(80), Some(&code), false)
        .unwrap();
    assert!(matches!(at, ThresholdOutcome::Warning(_)));

    let below = evaluator
        .evaluate(&rule(false), "79.999".parse().unwrap(), Some(&code), false)
        .unwrap();
    assert_eq!(below, ThresholdOutcome::Clear);
}

#[test]
fn just_above_limit_is_a_breach() {
    let evaluator = ThresholdEvaluator::default();
    let code = morphine();
    let outcome = evaluator
        .evaluate(&rule(true), "100.001".parse().unwrap(), Some(&code), false)
        .unwrap();
    assert!(matches!(
        outcome,
        ThresholdOutcome::Breach { override_eligible: true, .. }
    ));
}

// ---------------------------------------------------------------------------
// 3. 95 g and 101 g against 100 g / 80 %, no override
// ---------------------------------------------------------------------------

#[test]
fn ninety_five_grams_yields_warning_only() {
    let svc = service(vec![capped_licence("OW-1", None)], vec![rule(false)]);
    let outcome = svc
        .validate(transaction("95"), &PeriodUsage::none(), Timestamp::now())
        .unwrap();
    let result = outcome.result();
    assert!(result.is_valid);
    assert_eq!(result.errors().count(), 0);
    let warnings: Vec<_> = result.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].violation_type(), ViolationType::ThresholdWarning);
    assert_eq!(warnings[0].severity, Severity::Warning);
}

#[test]
fn hundred_and_one_grams_is_critical_and_not_overridable() {
    let svc = service(vec![capped_licence("OW-1", None)], vec![rule(false)]);
    let outcome = svc
        .validate(transaction("101"), &PeriodUsage::none(), Timestamp::now())
        .unwrap();
    let result = outcome.result();
    assert!(!result.is_valid);
    assert!(!result.override_eligible);
    let errors: Vec<_> = result.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].violation_type(), ViolationType::ThresholdExceeded);
    assert_eq!(errors[0].severity, Severity::Critical);
    assert!(!errors[0].override_eligible);
    assert_eq!(outcome.transaction.override_status, OverrideStatus::None);
}
