//! Seam to an external damage and loss engine.
//!
//! The pipeline hands the engine one site's spectral accelerations per
//! pseudo-event, the matching magnitudes, and the bridge-relevant period
//! indices. The returned values are stored and stitched with the other
//! results; they are never interpreted here.

use ndarray::{Array1, ArrayView2};
use quake_types::Site;

/// Errors reported by a loss engine.
#[derive(Debug, thiserror::Error)]
pub enum LossError {
    /// The engine rejected its input.
    #[error("loss engine failed for site {site}: {reason}")]
    Failed {
        /// Global site index.
        site: usize,
        /// Explanation from the engine.
        reason: String,
    },

    /// The engine returned the wrong number of values.
    #[error("loss engine returned {actual} values for {expected} pseudo-events")]
    LengthMismatch {
        /// Number of pseudo-events supplied.
        expected: usize,
        /// Number of values returned.
        actual: usize,
    },
}

/// External damage and loss model.
pub trait LossEngine: Send + Sync {
    /// Assess one site.
    ///
    /// `sa` is shaped `[pseudo_event, period]`; `magnitudes` has one entry per
    /// pseudo-event. Returns one loss value per pseudo-event.
    fn assess(
        &self,
        site: &Site,
        sa: ArrayView2<'_, f64>,
        magnitudes: &[f64],
        bridge_period_indices: &[usize],
    ) -> Result<Array1<f64>, LossError>;
}

/// Check a loss vector has one value per pseudo-event.
pub(crate) fn check_length(values: &Array1<f64>, expected: usize) -> Result<(), LossError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(LossError::LengthMismatch {
            expected,
            actual: values.len(),
        })
    }
}
