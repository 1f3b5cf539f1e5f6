//! Calibrate command implementation.

use clap::ValueEnum;
use givetrack_calibrator::Calibrator;
use serde::Serialize;

/// Calibrator operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    /// Move one share and redistribute the difference
    Shift,
    /// Set every share to an equal split
    Reset,
    /// Spread the deficit evenly across the shares
    Recalibrate,
    /// Remove one share and recalibrate the rest
    Remove,
}

/// Calibration outcome.
#[derive(Debug, Serialize, PartialEq)]
pub struct CalibrateOutcome {
    /// Resulting shares.
    pub percents: Vec<f64>,
    /// Whether the list changed.
    pub changed: bool,
    /// Sum of the resulting shares.
    pub sum: f64,
}

/// Applies `operation` to `percents`.
pub fn apply(
    operation: Operation,
    mut percents: Vec<f64>,
    index: usize,
    magnitude: f64,
    precision: u32,
    force: bool,
) -> Result<CalibrateOutcome, Box<dyn std::error::Error>> {
    let calibrator = Calibrator::new(precision)?;
    let changed = match operation {
        Operation::Shift => calibrator.shift(&mut percents, index, magnitude)?,
        Operation::Reset => calibrator.reset(&mut percents, force)?,
        Operation::Recalibrate => calibrator.recalibrate(&mut percents, force)?,
        Operation::Remove => {
            calibrator.remove_at(&mut percents, index)?;
            true
        }
    };
    let sum = percents.iter().sum();
    Ok(CalibrateOutcome {
        percents,
        changed,
        sum,
    })
}

/// Runs the calibrate command.
pub fn run(
    operation: Operation,
    percents: Vec<f64>,
    index: usize,
    magnitude: f64,
    precision: u32,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = apply(operation, percents, index, magnitude, precision, force)?;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_saturates() {
        let outcome = apply(Operation::Shift, vec![0.5, 0.5], 0, 0.6, 4, false).unwrap();
        assert_eq!(outcome.percents, vec![1.0, 0.0]);
        assert!(outcome.changed);
    }

    #[test]
    fn remove_recalibrates() {
        let outcome = apply(Operation::Remove, vec![0.5, 0.3, 0.2], 0, 0.0, 4, false).unwrap();
        assert_eq!(outcome.percents.len(), 2);
        assert!((outcome.percents[0] - 0.55).abs() < 1e-9);
        assert!((outcome.sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bad_magnitude_is_an_error() {
        assert!(apply(Operation::Shift, vec![0.5, 0.5], 0, 2.0, 4, false).is_err());
    }
}
