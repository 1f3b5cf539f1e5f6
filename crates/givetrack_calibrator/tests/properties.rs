//! Property tests for the calibrator invariants.

use givetrack_calibrator::{recalibrate, remove_at, reset, shift};
use proptest::prelude::*;

const PRECISION: u32 = 4;
const TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone)]
enum Step {
    Add,
    Shift { index: usize, magnitude: f64 },
    Remove { index: usize },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        1 => Just(Step::Add),
        4 => (any::<usize>(), -1.0f64..=1.0).prop_map(|(index, magnitude)| Step::Shift { index, magnitude }),
        1 => any::<usize>().prop_map(|index| Step::Remove { index }),
    ]
}

fn assert_invariants(percents: &[f64]) -> Result<(), TestCaseError> {
    for percent in percents {
        prop_assert!((0.0..=1.0).contains(percent), "out of bounds: {:?}", percents);
    }
    if !percents.is_empty() {
        let sum: f64 = percents.iter().sum();
        prop_assert!((sum - 1.0).abs() <= TOLERANCE, "sum {} for {:?}", sum, percents);
    }
    Ok(())
}

proptest! {
    #[test]
    fn sum_and_bounds_hold_across_operations(steps in prop::collection::vec(step_strategy(), 1..40)) {
        let mut percents = vec![1.0];
        for step in steps {
            match step {
                Step::Add => {
                    // A newcomer joins at zero while the set is whole, else takes everything.
                    let share = if percents.is_empty() { 1.0 } else { 0.0 };
                    percents.push(share);
                }
                Step::Shift { index, magnitude } => {
                    if !percents.is_empty() {
                        let index = index % percents.len();
                        shift(&mut percents, index, magnitude, PRECISION).unwrap();
                    }
                }
                Step::Remove { index } => {
                    if !percents.is_empty() {
                        let index = index % percents.len();
                        remove_at(&mut percents, index, PRECISION).unwrap();
                    }
                }
            }
            assert_invariants(&percents)?;
        }
    }

    #[test]
    fn zero_magnitude_never_mutates(percents in prop::collection::vec(0.0f64..=1.0, 0..8), index in any::<usize>()) {
        let mut copy = percents.clone();
        let index = if copy.is_empty() { 0 } else { index % copy.len() };
        prop_assert!(!shift(&mut copy, index, 0.0, PRECISION).unwrap());
        prop_assert_eq!(copy, percents);
    }

    #[test]
    fn reset_yields_equal_shares(mut percents in prop::collection::vec(0.0f64..=1.0, 1..12)) {
        reset(&mut percents, true, PRECISION).unwrap();
        let expected = 1.0 / percents.len() as f64;
        for percent in &percents {
            prop_assert!((percent - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn recalibrate_after_removal_restores_sum(
        raw in prop::collection::vec(0.01f64..=1.0, 2..10),
        index in any::<usize>(),
    ) {
        let total: f64 = raw.iter().sum();
        let mut percents: Vec<f64> = raw.iter().map(|p| p / total).collect();
        let index = index % percents.len();
        remove_at(&mut percents, index, PRECISION).unwrap();
        assert_invariants(&percents)?;
    }

    #[test]
    fn recalibrate_stays_in_bounds(mut percents in prop::collection::vec(0.0f64..=1.0, 1..10)) {
        recalibrate(&mut percents, true, PRECISION).unwrap();
        for percent in &percents {
            prop_assert!((0.0..=1.0).contains(percent));
        }
    }
}
