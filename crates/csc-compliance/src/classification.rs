//! # Classification Resolution
//!
//! Past transactions are judged under the classification in force on
//! their date, even after the substance has been reclassified. Resolution
//! uses only completed reclassification events; pending and cancelled ones
//! are ignored.
//!
//! ## Algorithm
//!
//! 1. Completed events effective on or before the as-of date exist: the
//!    latest one's `new` pair applies. Equal dates resolve to the event
//!    recorded last.
//! 2. Otherwise, completed events exist but all take effect later: the
//!    earliest one's `previous` pair applies. Equal dates resolve to the
//!    event recorded first.
//! 3. No completed events: the substance's current classification.

use chrono::NaiveDate;
use csc_registry::{Classification, Substance};

/// The classification pair in force for `substance` on `as_of`.
pub fn classification_as_of(substance: &Substance, as_of: NaiveDate) -> Classification {
    let latest_applied = substance
        .completed_reclassifications()
        .filter(|(_, event)| event.effective_date <= as_of)
        .max_by_key(|(position, event)| (event.effective_date, *position));

    if let Some((_, event)) = latest_applied {
        return event.new;
    }

    let earliest_pending = substance
        .completed_reclassifications()
        .min_by_key(|(position, event)| (event.effective_date, *position));

    match earliest_pending {
        Some((_, event)) => {
            tracing::debug!(
                substance = %substance.code,
                %as_of,
                first_effective = %event.effective_date,
                "as-of date precedes all reclassifications; using prior classification"
            );
            event.previous
        }
        None => substance.classification,
    }
}

/// True if a completed reclassification takes effect strictly after `date`.
pub fn has_been_reclassified_since(substance: &Substance, date: NaiveDate) -> bool {
    substance
        .completed_reclassifications()
        .any(|(_, event)| event.effective_date > date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use csc_core::{ReclassificationId, SubstanceCode};
    use csc_registry::{NarcoticsList, PrecursorCategory, ReclassificationEvent, ReclassificationStatus};
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(
        previous: Classification,
        new: Classification,
        effective_date: NaiveDate,
        status: ReclassificationStatus,
    ) -> ReclassificationEvent {
        ReclassificationEvent {
            id: ReclassificationId::new(),
            previous,
            new,
            effective_date,
            status,
            regulatory_reference: None,
        }
    }

    fn substance(current: Classification) -> Substance {
        Substance::new(SubstanceCode::new("OXYCODONE").unwrap(), "Oxycodone", current)
    }

    const II: Classification = Classification {
        narcotics: NarcoticsList::II,
        precursor: PrecursorCategory::None,
    };
    const I: Classification = Classification {
        narcotics: NarcoticsList::I,
        precursor: PrecursorCategory::None,
    };

    #[test]
    fn past_transaction_keeps_prior_classification() {
        let mut s = substance(I);
        s.reclassifications
            .push(event(II, I, date(2026, 1, 1), ReclassificationStatus::Completed));

        assert_eq!(classification_as_of(&s, date(2025, 12, 15)), II);
        assert_eq!(classification_as_of(&s, date(2026, 1, 1)), I);
        assert_eq!(classification_as_of(&s, date(2026, 3, 1)), I);
    }

    #[test]
    fn pending_and_cancelled_events_are_ignored() {
        let mut s = substance(II);
        s.reclassifications
            .push(event(II, I, date(2025, 1, 1), ReclassificationStatus::Pending));
        s.reclassifications
            .push(event(II, I, date(2025, 2, 1), ReclassificationStatus::Cancelled));
        assert_eq!(classification_as_of(&s, date(2025, 6, 1)), II);
        assert!(!has_been_reclassified_since(&s, date(2024, 1, 1)));
    }

    #[test]
    fn unordered_history_is_resolved_by_date() {
        let iii = Classification::narcotic(NarcoticsList::III);
        let mut s = substance(I);
        s.reclassifications
            .push(event(II, I, date(2025, 6, 1), ReclassificationStatus::Completed));
        s.reclassifications
            .push(event(iii, II, date(2024, 6, 1), ReclassificationStatus::Completed));

        assert_eq!(classification_as_of(&s, date(2024, 1, 1)), iii);
        assert_eq!(classification_as_of(&s, date(2024, 12, 1)), II);
        assert_eq!(classification_as_of(&s, date(2025, 12, 1)), I);
    }

    #[test]
    fn equal_dates_prefer_recording_order() {
        let iii = Classification::narcotic(NarcoticsList::III);
        let iv = Classification::narcotic(NarcoticsList::IV);
        let mut s = substance(I);
        s.reclassifications
            .push(event(II, iii, date(2025, 6, 1), ReclassificationStatus::Completed));
        s.reclassifications
            .push(event(iv, I, date(2025, 6, 1), ReclassificationStatus::Completed));

        // Latest pick: recorded last wins.
        assert_eq!(classification_as_of(&s, date(2025, 6, 1)), I);
        // Earliest pick: recorded first wins.
        assert_eq!(classification_as_of(&s, date(2025, 5, 31)), II);
    }

    #[test]
    fn reclassified_since_is_strict() {
        let mut s = substance(I);
        s.reclassifications
            .push(event(II, I, date(2026, 1, 1), ReclassificationStatus::Completed));
        assert!(has_been_reclassified_since(&s, date(2025, 12, 31)));
        assert!(!has_been_reclassified_since(&s, date(2026, 1, 1)));
    }

    fn arb_classification() -> impl Strategy<Value = Classification> {
        let lists = prop::sample::select(vec![
            NarcoticsList::None,
            NarcoticsList::I,
            NarcoticsList::II,
            NarcoticsList::III,
            NarcoticsList::IV,
            NarcoticsList::V,
        ]);
        let categories = prop::sample::select(vec![
            PrecursorCategory::None,
            PrecursorCategory::Category1,
            PrecursorCategory::Category2A,
            PrecursorCategory::Category2B,
            PrecursorCategory::Category3,
            PrecursorCategory::Category4,
        ]);
        (lists, categories)
            .prop_map(|(n, p)| Classification::new(n, p))
            .prop_filter("controlled", Classification::is_controlled)
    }

    /// A chronologically consistent history: distinct effective dates, each
    /// event's `previous` equal to the prior event's `new`.
    fn arb_history() -> impl Strategy<Value = (Classification, Vec<(NaiveDate, Classification)>)> {
        (
            arb_classification(),
            prop::collection::btree_set(0i64..2000, 1..6),
            prop::collection::vec(arb_classification(), 6),
        )
            .prop_map(|(initial, offsets, news)| {
                let base = date(2020, 1, 1);
                let steps = offsets
                    .into_iter()
                    .zip(news)
                    .map(|(offset, new)| (base + chrono::Duration::days(offset), new))
                    .collect();
                (initial, steps)
            })
    }

    fn build(initial: Classification, steps: &[(NaiveDate, Classification)], order: &[usize]) -> Substance {
        let mut s = substance(steps.last().map_or(initial, |(_, c)| *c));
        for &i in order {
            let previous = if i == 0 { initial } else { steps[i - 1].1 };
            s.reclassifications
                .push(event(previous, steps[i].1, steps[i].0, ReclassificationStatus::Completed));
        }
        s
    }

    proptest! {
        #[test]
        fn no_history_returns_current(c in arb_classification(), offset in 0i64..5000) {
            let s = substance(c);
            let as_of = date(2015, 1, 1) + chrono::Duration::days(offset);
            prop_assert_eq!(classification_as_of(&s, as_of), c);
        }

        #[test]
        fn between_events_returns_kth_new(
            (initial, steps) in arb_history(),
            shuffle_seed in any::<u64>(),
        ) {
            let mut order: Vec<usize> = (0..steps.len()).collect();
            // Deterministic permutation from the seed; recording order must not matter.
            order.sort_by_key(|i| (*i as u64).wrapping_mul(shuffle_seed | 1).rotate_left(17));
            let s = build(initial, &steps, &order);

            let before_first = steps[0].0 - chrono::Duration::days(1);
            prop_assert_eq!(classification_as_of(&s, before_first), initial);

            for (k, (effective, new)) in steps.iter().enumerate() {
                prop_assert_eq!(classification_as_of(&s, *effective), *new);
                let next = steps.get(k + 1).map(|(d, _)| *d);
                if let Some(next) = next {
                    let day_before_next = next - chrono::Duration::days(1);
                    prop_assert_eq!(classification_as_of(&s, day_before_next), *new);
                }
            }
        }
    }
}
