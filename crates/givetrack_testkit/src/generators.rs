//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use givetrack_store::{Allocation, HistoryEntry, OwnerId};
use proptest::prelude::*;

/// Strategy for generating owner ids.
pub fn owner_strategy() -> impl Strategy<Value = OwnerId> {
    prop::string::string_regex("[a-z][a-z0-9]{3,11}")
        .expect("Invalid regex")
        .prop_map(OwnerId::new)
}

/// Strategy for generating table stamps, including the unset stamp 0.
pub fn stamp_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![Just(0_i64), 1_i64..=4_000_000_000_000]
}

/// Strategy for generating shift magnitudes in `[-1, 1]`.
pub fn magnitude_strategy() -> impl Strategy<Value = f64> {
    -1.0_f64..=1.0
}

/// Strategy for generating percentage lists that sum to 1.
pub fn proportionate_percents_strategy(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1_u32..=100, 1..=max_len.max(1)).prop_map(|weights| {
        let total: u32 = weights.iter().sum();
        weights
            .into_iter()
            .map(|w| f64::from(w) / f64::from(total))
            .collect()
    })
}

/// Strategy for generating an owner's allocation set that sums to 1.
pub fn allocation_set_strategy(owner: OwnerId, max_len: usize) -> impl Strategy<Value = Vec<Allocation>> {
    proportionate_percents_strategy(max_len).prop_map(move |percents| {
        percents
            .into_iter()
            .enumerate()
            .map(|(i, percent)| {
                Allocation::new(owner.clone(), format!("b{i}"), format!("Beneficiary {i}"))
                    .with_percent(percent)
            })
            .collect()
    })
}

/// Strategy for generating history entries with distinct increasing times.
pub fn history_strategy(owner: OwnerId, beneficiaries: usize) -> impl Strategy<Value = Vec<HistoryEntry>> {
    let beneficiaries = beneficiaries.max(1);
    prop::collection::vec((0..beneficiaries, 1_u32..=10_000), 0..20).prop_map(move |entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (b, cents))| {
                HistoryEntry::new(
                    owner.clone(),
                    1_000 + i as i64,
                    format!("b{b}"),
                    format!("Beneficiary {b}"),
                    f64::from(cents) / 100.0,
                )
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use givetrack_calibrator::Calibrator;

    proptest! {
        #[test]
        fn generated_percents_are_proportionate(percents in proportionate_percents_strategy(8)) {
            prop_assert!(Calibrator::default().is_proportionate(&percents));
            prop_assert!(percents.iter().all(|p| (0.0..=1.0).contains(p)));
        }

        #[test]
        fn generated_history_times_increase(entries in history_strategy(OwnerId::new("u1"), 3)) {
            for pair in entries.windows(2) {
                prop_assert!(pair[0].time < pair[1].time);
            }
        }
    }
}
