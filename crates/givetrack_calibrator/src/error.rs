//! Error types for calibration.

use thiserror::Error;

/// Result type for calibration operations.
pub type CalibrateResult<T> = Result<T, CalibrateError>;

/// Contract violations reported by the calibrator.
///
/// These indicate caller error rather than a data condition: the calibrator
/// is total over its documented domain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrateError {
    /// Magnitude outside `[-1, 1]` (or not a number).
    #[error("magnitude {0} is outside [-1, 1]")]
    MagnitudeOutOfRange(f64),

    /// Precision outside `0..=16`.
    #[error("precision {0} is outside 0..=16")]
    PrecisionOutOfRange(u32),

    /// Index does not address an element.
    #[error("index {index} out of bounds for {len} elements")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of elements.
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CalibrateError::IndexOutOfRange { index: 3, len: 2 };
        assert_eq!(err.to_string(), "index 3 out of bounds for 2 elements");

        let err = CalibrateError::PrecisionOutOfRange(17);
        assert!(err.to_string().contains("17"));
    }
}
