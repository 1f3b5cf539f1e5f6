//! # Givetrack Calibrator
//!
//! Keeps an ordered list of percentages proportionate to the whole (1.0).
//!
//! This crate provides:
//! - `shift` to nudge one element while redistributing the difference
//! - `reset` to assign equal shares
//! - `recalibrate` to spread the deficit equally after a structural change
//! - `remove_at` to drop an element and repair the remainder
//!
//! ## Invariants
//!
//! - Every element stays in `[0, 1]`
//! - After any successful operation the sum is within `10^-precision` of 1.0
//!   (or the list is empty)
//!
//! This is a pure crate with no I/O operations.
//!
//! ```
//! use givetrack_calibrator::shift;
//!
//! let mut percents = vec![0.34, 0.33, 0.33];
//! assert!(shift(&mut percents, 0, -0.10, 4).unwrap());
//! assert!((percents[0] - 0.24).abs() < 1e-9);
//! assert!((percents[1] - 0.38).abs() < 1e-9);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;

pub use error::{CalibrateError, CalibrateResult};

/// Default number of decimal places of tolerance.
pub const STANDARD_PRECISION: u32 = 4;

/// Default adjustment step.
pub const STANDARD_MAGNITUDE: f64 = 0.01;

/// Largest precision accepted; beyond this `f64` cannot resolve the tolerance.
pub const MAX_PRECISION: u32 = 16;

/// Returns the tolerance `10^-precision`.
pub fn tolerance(precision: u32) -> CalibrateResult<f64> {
    if precision > MAX_PRECISION {
        return Err(CalibrateError::PrecisionOutOfRange(precision));
    }
    Ok(10f64.powi(-(precision as i32)))
}

/// Returns true if the elements sum to 1.0 within the tolerance.
///
/// An empty list is considered proportionate.
pub fn is_proportionate(percents: &[f64], precision: u32) -> CalibrateResult<bool> {
    let error = tolerance(precision)?;
    Ok(percents.is_empty() || (1.0 - percents.iter().sum::<f64>()).abs() <= error)
}

/// Adds `magnitude` to the element at `index` and redistributes the negated
/// difference across the other elements.
///
/// Returns `Ok(false)` without touching the list when `magnitude` is zero,
/// when fewer than two elements exist, or when the target is already pinned
/// against the direction of the shift.
///
/// Redistribution runs in equal-share passes over the elements that have not
/// reached their bound. An element crossing its bound is clamped, its
/// overshoot is returned to the pool and it takes no further share. At most
/// one pass per element is needed.
pub fn shift(
    percents: &mut [f64],
    index: usize,
    magnitude: f64,
    precision: u32,
) -> CalibrateResult<bool> {
    let error = tolerance(precision)?;
    if !(-1.0..=1.0).contains(&magnitude) {
        return Err(CalibrateError::MagnitudeOutOfRange(magnitude));
    }

    let len = percents.len();
    if magnitude == 0.0 || len < 2 {
        return Ok(false);
    }
    if index >= len {
        return Err(CalibrateError::IndexOutOfRange { index, len });
    }

    let current = percents[index];
    if (current <= 0.0 && magnitude < 0.0) || (current >= 1.0 && magnitude > 0.0) {
        return Ok(false);
    }

    let adjusted = current + magnitude;
    if adjusted >= 1.0 {
        for (i, percent) in percents.iter_mut().enumerate() {
            *percent = if i == index { 1.0 } else { 0.0 };
        }
        return Ok(true);
    }

    let mut remaining = -magnitude;
    if adjusted <= 0.0 {
        // Only `current` was actually taken from the target.
        remaining += adjusted;
        percents[index] = 0.0;
    } else {
        percents[index] = adjusted;
    }

    let mut excluded = vec![false; len];
    excluded[index] = true;
    let mut excluded_count = 1;
    for (i, percent) in percents.iter().enumerate() {
        if i != index && is_pinned(*percent, remaining) {
            excluded[i] = true;
            excluded_count += 1;
        }
    }

    let mut passes = 0;
    while remaining.abs() >= error && excluded_count < len && passes < len {
        passes += 1;
        let share = remaining / (len - excluded_count) as f64;
        for i in 0..len {
            if excluded[i] {
                continue;
            }
            let next = percents[i] + share;
            remaining -= share;
            if next > 1.0 {
                remaining += next - 1.0;
                percents[i] = 1.0;
                excluded[i] = true;
                excluded_count += 1;
            } else if next < 0.0 {
                remaining += next;
                percents[i] = 0.0;
                excluded[i] = true;
                excluded_count += 1;
            } else {
                percents[i] = next;
            }
        }
    }

    // Settle the sub-tolerance residue so repeated shifts do not drift.
    if remaining != 0.0 && excluded_count < len {
        let share = remaining / (len - excluded_count) as f64;
        for i in (0..len).filter(|i| !excluded[*i]) {
            percents[i] = (percents[i] + share).clamp(0.0, 1.0);
        }
    }

    Ok(true)
}

/// Sets every element to `1/n` when `force` is set or the sum is off by more
/// than the tolerance.
pub fn reset(percents: &mut [f64], force: bool, precision: u32) -> CalibrateResult<bool> {
    if percents.is_empty() {
        tolerance(precision)?;
        return Ok(false);
    }
    if !force && is_proportionate(percents, precision)? {
        return Ok(false);
    }
    let share = 1.0 / percents.len() as f64;
    percents.iter_mut().for_each(|percent| *percent = share);
    Ok(true)
}

/// Adds the signed deficit `(1 - sum) / n` to every element, clamped to
/// `[0, 1]`, when `force` is set or the sum is off by more than the tolerance.
pub fn recalibrate(percents: &mut [f64], force: bool, precision: u32) -> CalibrateResult<bool> {
    if percents.is_empty() {
        tolerance(precision)?;
        return Ok(false);
    }
    if !force && is_proportionate(percents, precision)? {
        return Ok(false);
    }
    let difference = (1.0 - percents.iter().sum::<f64>()) / percents.len() as f64;
    for percent in percents.iter_mut() {
        *percent = (*percent + difference).clamp(0.0, 1.0);
    }
    Ok(true)
}

/// Removes the element at `index`, then recalibrates the remainder.
///
/// Returns the removed value and whether the remainder was adjusted.
pub fn remove_at(
    percents: &mut Vec<f64>,
    index: usize,
    precision: u32,
) -> CalibrateResult<(f64, bool)> {
    tolerance(precision)?;
    if index >= percents.len() {
        return Err(CalibrateError::IndexOutOfRange {
            index,
            len: percents.len(),
        });
    }
    let removed = percents.remove(index);
    let adjusted = recalibrate(percents, false, precision)?;
    Ok((removed, adjusted))
}

/// True when `percent` cannot absorb a share of the given sign.
fn is_pinned(percent: f64, remaining: f64) -> bool {
    (remaining > 0.0 && percent >= 1.0) || (remaining < 0.0 && percent <= 0.0)
}

/// A calibrator bound to a fixed precision.
///
/// Convenience wrapper for callers that always calibrate at the same
/// tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibrator {
    precision: u32,
}

impl Calibrator {
    /// Creates a calibrator, validating the precision.
    pub fn new(precision: u32) -> CalibrateResult<Self> {
        tolerance(precision)?;
        Ok(Self { precision })
    }

    /// Returns the precision.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Returns the tolerance `10^-precision`.
    pub fn tolerance(&self) -> f64 {
        tolerance(self.precision).unwrap_or(0.0)
    }

    /// See [`shift`].
    pub fn shift(&self, percents: &mut [f64], index: usize, magnitude: f64) -> CalibrateResult<bool> {
        shift(percents, index, magnitude, self.precision)
    }

    /// See [`reset`].
    pub fn reset(&self, percents: &mut [f64], force: bool) -> CalibrateResult<bool> {
        reset(percents, force, self.precision)
    }

    /// See [`recalibrate`].
    pub fn recalibrate(&self, percents: &mut [f64], force: bool) -> CalibrateResult<bool> {
        recalibrate(percents, force, self.precision)
    }

    /// See [`remove_at`].
    pub fn remove_at(&self, percents: &mut Vec<f64>, index: usize) -> CalibrateResult<(f64, bool)> {
        remove_at(percents, index, self.precision)
    }

    /// See [`is_proportionate`].
    ///
    /// The precision was validated on construction, so the check cannot fail.
    pub fn is_proportionate(&self, percents: &[f64]) -> bool {
        is_proportionate(percents, self.precision).unwrap_or(false)
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self {
            precision: STANDARD_PRECISION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn zero_magnitude_is_noop() {
        let mut percents = vec![0.5, 0.5];
        assert!(!shift(&mut percents, 0, 0.0, 4).unwrap());
        assert_eq!(percents, vec![0.5, 0.5]);
    }

    #[test]
    fn single_element_is_noop() {
        let mut percents = vec![1.0];
        assert!(!shift(&mut percents, 0, -0.2, 4).unwrap());
        assert_eq!(percents, vec![1.0]);
    }

    #[test]
    fn saturated_target_is_noop() {
        let mut percents = vec![0.0, 1.0];
        assert!(!shift(&mut percents, 0, -0.1, 4).unwrap());
        assert!(!shift(&mut percents, 1, 0.1, 4).unwrap());
        assert_eq!(percents, vec![0.0, 1.0]);
    }

    #[test]
    fn shift_to_whole_zeroes_the_rest() {
        let mut percents = vec![0.5, 0.5];
        assert!(shift(&mut percents, 0, 0.6, 4).unwrap());
        assert_eq!(percents, vec![1.0, 0.0]);
    }

    #[test]
    fn shift_redistributes_equally() {
        let mut percents = vec![0.34, 0.33, 0.33];
        assert!(shift(&mut percents, 0, -0.10, 4).unwrap());
        assert_close(&percents, &[0.24, 0.38, 0.38]);
    }

    #[test]
    fn shift_clamps_target_at_zero() {
        let mut percents = vec![0.05, 0.45, 0.5];
        assert!(shift(&mut percents, 0, -0.2, 4).unwrap());
        assert_close(&percents, &[0.0, 0.475, 0.525]);
    }

    #[test]
    fn shift_excludes_elements_that_hit_zero() {
        let mut percents = vec![0.5, 0.02, 0.48];
        assert!(shift(&mut percents, 0, 0.1, 4).unwrap());
        // 0.02 can only give 0.02; the rest comes from the last element.
        assert_close(&percents, &[0.6, 0.0, 0.4]);
    }

    #[test]
    fn shift_skips_pinned_elements() {
        let mut percents = vec![0.6, 0.0, 0.4];
        assert!(shift(&mut percents, 0, 0.1, 4).unwrap());
        assert_close(&percents, &[0.7, 0.0, 0.3]);
    }

    #[test]
    fn shift_rejects_bad_arguments() {
        let mut percents = vec![0.5, 0.5];
        assert_eq!(
            shift(&mut percents, 0, 1.5, 4),
            Err(CalibrateError::MagnitudeOutOfRange(1.5))
        );
        assert_eq!(
            shift(&mut percents, 0, 0.1, 17),
            Err(CalibrateError::PrecisionOutOfRange(17))
        );
        assert_eq!(
            shift(&mut percents, 2, 0.1, 4),
            Err(CalibrateError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert!(shift(&mut percents, 0, f64::NAN, 4).is_err());
        assert_eq!(percents, vec![0.5, 0.5]);
    }

    #[test]
    fn reset_only_when_needed() {
        let mut percents = vec![0.7, 0.3];
        assert!(!reset(&mut percents, false, 4).unwrap());
        assert_eq!(percents, vec![0.7, 0.3]);

        assert!(reset(&mut percents, true, 4).unwrap());
        assert_eq!(percents, vec![0.5, 0.5]);

        let mut skewed = vec![0.7, 0.7];
        assert!(reset(&mut skewed, false, 4).unwrap());
        assert_eq!(skewed, vec![0.5, 0.5]);
    }

    #[test]
    fn recalibrate_spreads_deficit() {
        let mut percents = vec![0.3, 0.2];
        assert!(recalibrate(&mut percents, false, 4).unwrap());
        assert_close(&percents, &[0.55, 0.45]);

        let mut proportionate = vec![0.25, 0.75];
        assert!(!recalibrate(&mut proportionate, false, 4).unwrap());
    }

    #[test]
    fn recalibrate_clamps_to_bounds() {
        let mut percents = vec![0.9, 0.9, 0.0];
        assert!(recalibrate(&mut percents, false, 4).unwrap());
        // deficit -0.8/3 pulls the last element below zero
        assert_eq!(percents[2], 0.0);
        assert!(percents.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn remove_at_recalibrates_remainder() {
        let mut percents = vec![0.5, 0.3, 0.2];
        let (removed, adjusted) = remove_at(&mut percents, 0, 4).unwrap();
        assert_eq!(removed, 0.5);
        assert!(adjusted);
        assert_close(&percents, &[0.55, 0.45]);
    }

    #[test]
    fn remove_last_element_leaves_empty() {
        let mut percents = vec![1.0];
        let (removed, adjusted) = remove_at(&mut percents, 0, 4).unwrap();
        assert_eq!(removed, 1.0);
        assert!(!adjusted);
        assert!(percents.is_empty());
        assert!(is_proportionate(&percents, 4).unwrap());
    }

    #[test]
    fn calibrator_wrapper() {
        let calibrator = Calibrator::default();
        assert_eq!(calibrator.precision(), STANDARD_PRECISION);
        assert!((calibrator.tolerance() - 1e-4).abs() < f64::EPSILON);
        assert!(Calibrator::new(20).is_err());

        let mut percents = vec![1.0, 0.0];
        assert!(calibrator.shift(&mut percents, 1, STANDARD_MAGNITUDE).unwrap());
        assert_close(&percents, &[0.99, 0.01]);
        assert!(calibrator.is_proportionate(&percents));
    }

    #[test]
    fn calibrator_agrees_with_free_functions() {
        let cases: [&[f64]; 4] = [&[], &[0.5, 0.5], &[0.5, 0.49995], &[0.5, 0.49]];
        for precision in [0, 2, 4, 8, MAX_PRECISION] {
            let calibrator = Calibrator::new(precision).unwrap();
            assert_eq!(calibrator.tolerance(), tolerance(precision).unwrap());
            for percents in cases {
                assert_eq!(
                    calibrator.is_proportionate(percents),
                    is_proportionate(percents, precision).unwrap(),
                    "{percents:?} at precision {precision}"
                );
            }
        }
    }
}
