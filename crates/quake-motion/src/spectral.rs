//! Spectral post-processing of linear ground motion.
//!
//! - Events farther than the distance threshold from a site produce exactly
//!   zero motion at that site.
//! - A spectrum whose PGA exceeds the cutoff is scaled as a whole so its PGA
//!   equals the cutoff; the spectral shape is preserved.
//! - Optional 3-point smoothing over the period axis,
//!   `y[i] = 0.25 x[i-1] + 0.5 x[i] + 0.25 x[i+1]` for `2 <= i <= n-3`.
//!   The first and last two periods are left untouched. This mirrors legacy
//!   behaviour and may not be intended; it is off by default.

use ndarray::{Axis, s};
use quake_types::{EventCatalog, MotionTensor, Site};
use serde::{Deserialize, Serialize};

use crate::distance::DistanceMetric;
use crate::error::MotionError;

/// Post-processing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPostProcessor {
    /// Events beyond this distance give zero motion; `None` disables the cut.
    #[serde(default)]
    pub distance_threshold_km: Option<f64>,
    /// Metric used for the distance threshold.
    #[serde(default)]
    pub threshold_metric: DistanceMetric,
    /// Largest allowed PGA in g; `None` disables the cutoff.
    #[serde(default)]
    pub pga_cutoff: Option<f64>,
    /// Apply legacy 3-point period smoothing.
    #[serde(default)]
    pub smoothing: bool,
}

impl Default for SpectralPostProcessor {
    fn default() -> Self {
        Self {
            distance_threshold_km: None,
            threshold_metric: DistanceMetric::Epicentral,
            pga_cutoff: None,
            smoothing: false,
        }
    }
}

impl SpectralPostProcessor {
    /// Apply every enabled step in order: threshold, PGA cutoff, smoothing.
    ///
    /// `pga_index` is the period index holding PGA (period 0).
    pub fn process(
        &self,
        motion: &mut MotionTensor,
        sites: &[Site],
        catalog: &EventCatalog,
        pga_index: Option<usize>,
    ) -> Result<(), MotionError> {
        self.apply_distance_threshold(motion, sites, catalog)?;
        if let Some(index) = pga_index {
            self.apply_pga_cutoff(motion, index);
        }
        if self.smoothing {
            smooth_periods(motion);
        }
        Ok(())
    }

    /// Zero every `(site, event)` pair farther apart than the threshold.
    pub fn apply_distance_threshold(
        &self,
        motion: &mut MotionTensor,
        sites: &[Site],
        catalog: &EventCatalog,
    ) -> Result<(), MotionError> {
        let Some(threshold) = self.distance_threshold_km else {
            return Ok(());
        };
        motion.expect_axis(MotionTensor::SITE, sites.len())?;
        motion.expect_axis(MotionTensor::EVENT, catalog.len())?;
        let distances = self.threshold_metric.matrix(sites, catalog);
        for ((i, e), &d) in distances.indexed_iter() {
            if d > threshold {
                motion.data_mut().slice_mut(s![.., .., i, e, ..]).fill(0.0);
            }
        }
        Ok(())
    }

    /// Scale every spectrum whose PGA exceeds the cutoff down to the cutoff.
    pub fn apply_pga_cutoff(&self, motion: &mut MotionTensor, pga_index: usize) {
        let Some(cap) = self.pga_cutoff else {
            return;
        };
        for mut spectrum in motion.data_mut().lanes_mut(Axis(4)) {
            let pga = spectrum[pga_index];
            if pga > cap {
                let scale = cap / pga;
                spectrum.mapv_inplace(|v| v * scale);
                spectrum[pga_index] = cap;
            }
        }
    }
}

/// Legacy 3-point smoothing over the period axis.
pub fn smooth_periods(motion: &mut MotionTensor) {
    for mut spectrum in motion.data_mut().lanes_mut(Axis(4)) {
        let n = spectrum.len();
        if n < 5 {
            continue;
        }
        let original = spectrum.to_owned();
        for i in 2..=n - 3 {
            spectrum[i] = 0.25 * original[i - 1] + 0.5 * original[i] + 0.25 * original[i + 1];
        }
    }
}
