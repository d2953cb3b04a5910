//! # Licence Coverage Matching
//!
//! Decides which of the holder's licences covers each controlled line.
//!
//! ## Candidates
//!
//! A licence mapping is a candidate for a line when
//!
//! 1. the licence's activity set is a superset of the required activities,
//! 2. a mapping covers the substance and the base activity and has taken
//!    effect by the transaction date.
//!
//! A mapping that runs to the licence expiry follows the licence into its
//! grace period; a shorter mapping ends on its own expiry day. Suspended,
//! revoked and not-yet-effective licences are skipped. A candidate that has
//! lapsed (licence past grace, or mapping past its end) is remembered so the
//! caller can report `licence-expired` rather than `licence-missing`, but
//! only if it also had the capacity for the line.
//!
//! ## Capacity
//!
//! A per-transaction cap below the line quantity disqualifies the
//! candidate outright; there are no partial matches. A per-period cap is
//! checked against caller-supplied prior usage plus whatever earlier lines
//! of the same transaction already drew from the same mapping.
//!
//! ## Ranking
//!
//! Soonest mapping end first (open-ended last), then the configured
//! [`CoverageTieBreak`], then licence identifier.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use csc_core::{LicenceId, SubstanceCode};
use csc_registry::{
    Activity, ActivitySet, Classification, CoverageOutcome, Direction, Licence, LicenceValidity,
    NoCoverageReason, SubstanceMapping, TransactionType,
};
use rust_decimal::Decimal;

use crate::config::CoverageTieBreak;
use crate::usage::PeriodUsage;

/// The base activity a movement implies and the full set the licence must permit.
///
/// | Type       | Direction | Cross-border | Base activity |
/// |------------|-----------|--------------|---------------|
/// | any        | outbound  | yes          | export        |
/// | any        | inbound   | yes          | import        |
/// | return     | any       | no           | possess       |
/// | return     | internal  | yes          | possess       |
/// | non-return | outbound  | no           | distribute    |
/// | non-return | inbound   | no           | possess       |
/// | non-return | internal  | either       | store         |
///
/// A return takes goods back into stock, so domestically it needs
/// possession rather than distribution or storage.
///
/// Scheduled precursors additionally require `handle_precursors`.
pub fn required_activities(
    transaction_type: TransactionType,
    direction: Direction,
    cross_border: bool,
    classification: Classification,
) -> (Activity, ActivitySet) {
    let base = match (transaction_type, direction, cross_border) {
        (_, Direction::Outbound, true) => Activity::Export,
        (_, Direction::Inbound, true) => Activity::Import,
        (TransactionType::Return, _, _) => Activity::Possess,
        (_, Direction::Outbound, false) => Activity::Distribute,
        (_, Direction::Inbound, false) => Activity::Possess,
        (_, Direction::Internal, _) => Activity::Store,
    };
    let mut required = ActivitySet::empty().with(base);
    if classification.precursor.is_scheduled() {
        required.insert(Activity::HandlePrecursors);
    }
    (base, required)
}

/// What a line asks of the holder's licences.
#[derive(Debug, Clone)]
pub struct CoverageRequest<'a> {
    /// Line substance.
    pub substance: &'a SubstanceCode,
    /// Line quantity in base units.
    pub quantity: Decimal,
    /// Transaction date.
    pub date: NaiveDate,
    /// Activity mappings are checked against.
    pub base_activity: Activity,
    /// Activities the licence must permit.
    pub required: ActivitySet,
}

/// Coverage result for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageDecision {
    /// Outcome recorded on the line.
    pub outcome: CoverageOutcome,
    /// Grace-period end of the covering licence, when it is valid only through grace.
    pub grace_period_end: Option<NaiveDate>,
}

struct Candidate<'l> {
    licence: &'l Licence,
    mapping_index: usize,
    effective_end: Option<NaiveDate>,
    remaining_after: Option<Decimal>,
    in_grace: bool,
}

/// Matches lines of one transaction against the holder's licences.
///
/// Holds the quantities allocated to earlier lines so that later lines of
/// the same transaction see reduced period capacity. Create one matcher
/// per transaction and feed it lines in order.
pub struct CoverageMatcher<'a> {
    licences: &'a [Licence],
    usage: &'a PeriodUsage,
    tie_break: CoverageTieBreak,
    allocated: BTreeMap<(LicenceId, SubstanceCode), Decimal>,
}

impl<'a> CoverageMatcher<'a> {
    /// A matcher over the holder's licences and prior period usage.
    pub fn new(licences: &'a [Licence], usage: &'a PeriodUsage, tie_break: CoverageTieBreak) -> Self {
        Self {
            licences,
            usage,
            tie_break,
            allocated: BTreeMap::new(),
        }
    }

    /// Quantity already allocated to `licence` for `substance` by earlier lines.
    pub fn allocated(&self, licence: &LicenceId, substance: &SubstanceCode) -> Decimal {
        self.allocated
            .get(&(licence.clone(), substance.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Find the covering licence for one line and record the allocation.
    pub fn match_line(&mut self, request: &CoverageRequest<'_>) -> CoverageDecision {
        let mut expired = Vec::new();
        let mut over_capacity = Vec::new();
        let mut qualified = Vec::new();

        for licence in self.licences {
            if !licence.activities.is_superset_of(&request.required) {
                continue;
            }
            // The expiry bound is left out here so that a lapsed mapping is
            // reported as expired rather than missing.
            let applicable = licence.mappings.iter().enumerate().filter(|(_, m)| {
                m.applies_to(request.substance, request.base_activity) && m.started_by(request.date)
            });

            for (mapping_index, mapping) in applicable {
                let validity = licence.validity_on(request.date);
                let lapsed = match validity {
                    LicenceValidity::Valid | LicenceValidity::InGracePeriod => {
                        !licence.mapping_in_window(mapping, request.date)
                    }
                    LicenceValidity::Expired => true,
                    LicenceValidity::NotYetEffective
                    | LicenceValidity::Suspended
                    | LicenceValidity::Revoked => continue,
                };

                match self.remaining_after(licence, mapping, request) {
                    Err(()) => push_unique(&mut over_capacity, &licence.id),
                    Ok(_) if lapsed => push_unique(&mut expired, &licence.id),
                    Ok(remaining_after) => qualified.push(Candidate {
                        licence,
                        mapping_index,
                        effective_end: licence.mapping_end(mapping),
                        remaining_after,
                        in_grace: validity == LicenceValidity::InGracePeriod,
                    }),
                }
            }
        }

        let tie_break = self.tie_break;
        qualified.sort_by(|a, b| rank(a, b, tie_break));

        let Some(best) = qualified.into_iter().next() else {
            let reason = if !expired.is_empty() {
                NoCoverageReason::Expired {
                    licence_ids: expired,
                }
            } else if !over_capacity.is_empty() {
                NoCoverageReason::CapacityExceeded {
                    licence_ids: over_capacity,
                }
            } else {
                NoCoverageReason::NoLicence
            };
            tracing::debug!(
                substance = %request.substance,
                quantity = %request.quantity,
                ?reason,
                "no covering licence"
            );
            return CoverageDecision {
                outcome: CoverageOutcome::NotCovered { reason },
                grace_period_end: None,
            };
        };

        let key = (best.licence.id.clone(), request.substance.clone());
        *self.allocated.entry(key).or_insert(Decimal::ZERO) += request.quantity;

        tracing::debug!(
            substance = %request.substance,
            licence = %best.licence.id,
            mapping = best.mapping_index,
            in_grace = best.in_grace,
            "line covered"
        );

        CoverageDecision {
            grace_period_end: if best.in_grace {
                best.licence.grace_period_end
            } else {
                None
            },
            outcome: CoverageOutcome::Covered {
                licence_id: best.licence.id.clone(),
                in_grace_period: best.in_grace,
                consumed: request.quantity,
                remaining_in_period: best.remaining_after,
            },
        }
    }

    /// Period capacity left after drawing the line, `Ok(None)` when the
    /// mapping has no period cap, `Err(())` when a cap is exceeded.
    fn remaining_after(
        &self,
        licence: &Licence,
        mapping: &SubstanceMapping,
        request: &CoverageRequest<'_>,
    ) -> Result<Option<Decimal>, ()> {
        if mapping
            .max_per_transaction
            .is_some_and(|cap| request.quantity > cap)
        {
            return Err(());
        }
        let Some(period_cap) = mapping.max_per_period else {
            return Ok(None);
        };
        let used = self.usage.licence_usage(&licence.id, request.substance)
            + self.allocated(&licence.id, request.substance);
        let remaining = period_cap - used;
        if request.quantity > remaining {
            return Err(());
        }
        Ok(Some(remaining - request.quantity))
    }
}

fn push_unique(ids: &mut Vec<LicenceId>, id: &LicenceId) {
    if !ids.contains(id) {
        ids.push(id.clone());
    }
}

/// `None` (open-ended) sorts after every date.
fn cmp_end(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn rank(a: &Candidate<'_>, b: &Candidate<'_>, tie_break: CoverageTieBreak) -> Ordering {
    cmp_end(a.effective_end, b.effective_end)
        .then_with(|| match tie_break {
            CoverageTieBreak::LicenceId => Ordering::Equal,
            // Uncapped first, then larger remaining capacity.
            CoverageTieBreak::MostRemainingCapacity => match (a.remaining_after, b.remaining_after) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => y.cmp(&x),
            },
            CoverageTieBreak::EarliestIssueDate => a.licence.issue_date.cmp(&b.licence.issue_date),
        })
        .then_with(|| a.licence.id.cmp(&b.licence.id))
        .then_with(|| a.mapping_index.cmp(&b.mapping_index))
}
