//! Hazard-curve aggregation.
//!
//! Pseudo-events (spawn × branch × event) are ranked by amplitude, highest
//! first. The running sum of their activity is the annual rate at which each
//! amplitude is exceeded. For every requested rate the crossing amplitude is
//! interpolated linearly in log-rate between the bracketing pseudo-events.
//! Rates outside the observed range clamp to the nearest end of the curve.

use ndarray::{Array2, ArrayView1, Axis};
use quake_types::{EventActivity, MotionTensor, ShapeError};

/// Converts motion and activity into intensities at target return periods.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardAggregator {
    return_periods: Vec<f64>,
    rates: Vec<f64>,
}

impl HazardAggregator {
    /// Create an aggregator for the given return periods in years.
    pub fn new(return_periods: &[f64]) -> Self {
        Self {
            return_periods: return_periods.to_vec(),
            rates: return_periods.iter().map(|rp| 1.0 / rp).collect(),
        }
    }

    /// Requested return periods.
    pub fn return_periods(&self) -> &[f64] {
        &self.return_periods
    }

    /// Annual exceedance rates matching the return periods.
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Intensities for one site, shaped `[return_period, period]`.
    ///
    /// `motion` holds a single site; its `[spawn, branch, event]` axes must
    /// match `activity`.
    pub fn aggregate_site(
        &self,
        motion: &MotionTensor,
        activity: &EventActivity,
    ) -> Result<Array2<f64>, ShapeError> {
        motion.expect_axis(MotionTensor::SITE, 1)?;
        motion.expect_axis(MotionTensor::SPAWN, activity.spawns())?;
        motion.expect_axis(MotionTensor::BRANCH, activity.branches())?;
        motion.expect_axis(MotionTensor::EVENT, activity.events())?;

        let rates = activity.flatten();
        let site = motion.site(0);
        let periods = motion.shape().periods;
        let mut out = Array2::zeros((self.rates.len(), periods));
        for (p, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let amplitudes: Vec<f64> = site.index_axis(Axis(3), p).iter().copied().collect();
            let values = self.exceedance_amplitudes(
                ArrayView1::from(amplitudes.as_slice()),
                rates.view(),
            )?;
            for (cell, value) in column.iter_mut().zip(values) {
                *cell = value;
            }
        }
        Ok(out)
    }

    /// Crossing amplitude for each requested rate.
    ///
    /// `amplitudes` and `activity` are matched pseudo-event vectors. Returns
    /// zeros when no pseudo-event carries activity.
    pub fn exceedance_amplitudes(
        &self,
        amplitudes: ArrayView1<'_, f64>,
        activity: ArrayView1<'_, f64>,
    ) -> Result<Vec<f64>, ShapeError> {
        if amplitudes.len() != activity.len() {
            return Err(ShapeError::AxisMismatch {
                axis: "pseudo_event",
                expected: activity.len(),
                actual: amplitudes.len(),
            });
        }

        let mut ranked: Vec<(f64, f64)> = amplitudes
            .iter()
            .zip(activity.iter())
            .filter(|&(_, &rate)| rate > 0.0)
            .map(|(&amp, &rate)| (amp, rate))
            .collect();
        if ranked.is_empty() {
            return Ok(vec![0.0; self.rates.len()]);
        }
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut cumulative = Vec::with_capacity(ranked.len());
        let mut total = 0.0;
        for &(_, rate) in &ranked {
            total += rate;
            cumulative.push(total);
        }
        let amps: Vec<f64> = ranked.iter().map(|&(amp, _)| amp).collect();

        Ok(self
            .rates
            .iter()
            .map(|&rate| interpolate(&amps, &cumulative, rate))
            .collect())
    }
}

/// Amplitude at `rate` on a curve of descending `amps` and ascending `cumulative`.
fn interpolate(amps: &[f64], cumulative: &[f64], rate: f64) -> f64 {
    let last = cumulative.len() - 1;
    if rate <= cumulative[0] {
        return amps[0];
    }
    if rate >= cumulative[last] {
        return amps[last];
    }
    // First index whose cumulative rate reaches `rate`; always in 1..=last.
    let upper = cumulative.partition_point(|&c| c < rate);
    let lower = upper - 1;
    let (c0, c1) = (cumulative[lower].ln(), cumulative[upper].ln());
    let t = (rate.ln() - c0) / (c1 - c0);
    amps[lower] + t * (amps[upper] - amps[lower])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ndarray::{Array3, array};
    use quake_types::MotionShape;

    use super::*;

    fn aggregator(return_periods: &[f64]) -> HazardAggregator {
        HazardAggregator::new(return_periods)
    }

    #[test]
    fn exact_crossings_return_the_ranked_amplitude() {
        let amps = array![0.1, 0.4, 0.2];
        let rates = array![0.01, 0.001, 0.002];
        // Ranked: 0.4 @ 0.001, 0.2 @ 0.003, 0.1 @ 0.013.
        let out = aggregator(&[1000.0, 1.0 / 0.003])
            .exceedance_amplitudes(amps.view(), rates.view())
            .unwrap();
        assert!((out[0] - 0.4).abs() < 1e-12);
        assert!((out[1] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn interpolation_is_linear_in_log_rate() {
        let amps = array![0.4, 0.2];
        let rates = array![0.001, 0.009];
        // Cumulative 0.001 and 0.01; 0.00316 is halfway in log space.
        let target = (0.001_f64.ln() + 0.01_f64.ln()) / 2.0;
        let out = aggregator(&[1.0 / target.exp()])
            .exceedance_amplitudes(amps.view(), rates.view())
            .unwrap();
        assert!((out[0] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn rates_outside_the_curve_are_clamped() {
        let amps = array![0.5, 0.3];
        let rates = array![0.01, 0.01];
        let out = aggregator(&[1e6, 1.0])
            .exceedance_amplitudes(amps.view(), rates.view())
            .unwrap();
        assert!((out[0] - 0.5).abs() < f64::EPSILON);
        assert!((out[1] - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_activity_events_are_ignored() {
        let amps = array![9.0, 0.3];
        let rates = array![0.0, 0.01];
        let out = aggregator(&[1e6])
            .exceedance_amplitudes(amps.view(), rates.view())
            .unwrap();
        assert!((out[0] - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn no_activity_gives_zero() {
        let amps = array![0.2, 0.3];
        let rates = array![0.0, 0.0];
        let out = aggregator(&[475.0])
            .exceedance_amplitudes(amps.view(), rates.view())
            .unwrap();
        assert_eq!(out, vec![0.0]);
    }

    #[test]
    fn higher_rates_never_give_higher_intensity() {
        let n = 200;
        let amps: Vec<f64> = (0..n).map(|i| ((i * 37) % 101) as f64 / 50.0).collect();
        let rates: Vec<f64> = (0..n).map(|i| 1e-4 * (1 + (i * 13) % 7) as f64).collect();
        let return_periods: Vec<f64> = (1..60).map(|k| 10.0 * 1.2_f64.powi(k)).collect();
        let out = aggregator(&return_periods)
            .exceedance_amplitudes(
                ArrayView1::from(amps.as_slice()),
                ArrayView1::from(rates.as_slice()),
            )
            .unwrap();
        // Return periods ascend, so rates descend and intensity must not fall.
        for pair in out.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn site_aggregation_flattens_spawn_branch_event() {
        let shape = MotionShape {
            spawns: 2,
            branches: 1,
            sites: 1,
            events: 2,
            periods: 2,
        };
        let motion =
            MotionTensor::from_vec(shape, vec![0.1, 1.0, 0.2, 2.0, 0.3, 3.0, 0.4, 4.0]).unwrap();
        let activity =
            EventActivity::from_array(Array3::from_shape_vec((2, 1, 2), vec![0.1; 4]).unwrap())
                .unwrap();
        let out = aggregator(&[100.0]).aggregate_site(&motion, &activity).unwrap();
        assert_eq!(out.dim(), (1, 2));
        // Highest amplitude alone carries rate 0.1 >= 0.01, so it is clamped to.
        assert!((out[[0, 0]] - 0.4).abs() < f64::EPSILON);
        assert!((out[[0, 1]] - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let amps = array![0.1, 0.2];
        let rates = array![0.1];
        assert!(
            aggregator(&[10.0])
                .exceedance_amplitudes(amps.view(), rates.view())
                .is_err()
        );
    }
}
