//! Logic-tree weight validation and normalisation.
//!
//! Weights read from configuration only need to sum to 1 within
//! [`INPUT_TOLERANCE`]. Everything downstream works with normalised weights
//! that sum to 1 within floating-point rounding.

/// Largest deviation from 1 accepted for raw weight sums.
pub const INPUT_TOLERANCE: f64 = 0.01;

/// Errors raised by weight validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    /// No weights were supplied.
    #[error("weight list is empty")]
    Empty,

    /// A weight is negative or not finite.
    #[error("weight {index} is invalid: {value}")]
    InvalidWeight {
        /// Position of the offending weight.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// The weights do not sum to 1 within the input tolerance.
    #[error("weights sum to {sum}, expected 1 within {tolerance}")]
    BadSum {
        /// Actual sum.
        sum: f64,
        /// Accepted tolerance.
        tolerance: f64,
    },
}

/// Validate raw weights and rescale them to sum to exactly 1.
pub fn normalize_weights(raw: &[f64]) -> Result<Vec<f64>, WeightError> {
    if raw.is_empty() {
        return Err(WeightError::Empty);
    }
    if let Some((index, &value)) = raw
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(WeightError::InvalidWeight { index, value });
    }

    let sum: f64 = raw.iter().sum();
    if (sum - 1.0).abs() > INPUT_TOLERANCE {
        return Err(WeightError::BadSum {
            sum,
            tolerance: INPUT_TOLERANCE,
        });
    }
    Ok(raw.iter().map(|w| w / sum).collect())
}
