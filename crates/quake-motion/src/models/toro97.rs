//! Toro, Abrahamson and Schneider (1997), mid-continent, moment magnitude.
//!
//! ```text
//! ln Y = c1 + c2 (M - 6) + c3 (M - 6)^2 - c4 ln(R_M)
//!        - (c5 - c4) max(ln(R_M / 100), 0) - c6 R_M
//! R_M  = sqrt(R_jb^2 + c7^2)
//! ```
//!
//! `Y` is spectral acceleration in g (5% damping); period 0 is PGA.

use ndarray::{Array3, ArrayView2};

use super::GroundMotionModel;
use super::table::CoefficientTable;
use crate::distance::DistanceMetric;
use crate::error::MotionError;

/// Columns: c1, c2, c3, c4, c5, c6, c7, total ln sigma.
const COEFFICIENTS: CoefficientTable<8> = CoefficientTable::new(
    &[0.0, 0.029, 0.04, 0.1, 0.2, 0.4, 1.0, 2.0],
    &[
        [2.20, 0.81, 0.00, 1.27, 1.16, 0.0021, 9.3, 0.75],
        [4.00, 0.79, 0.00, 1.55, 1.89, 0.0008, 11.1, 0.77],
        [3.68, 0.80, 0.00, 1.46, 1.77, 0.0013, 10.5, 0.78],
        [2.37, 0.81, 0.00, 1.10, 1.02, 0.0040, 8.3, 0.72],
        [1.73, 0.84, 0.00, 0.98, 0.66, 0.0042, 7.5, 0.71],
        [1.07, 1.05, -0.10, 0.93, 0.56, 0.0033, 7.1, 0.74],
        [0.09, 1.42, -0.20, 0.90, 0.49, 0.0023, 6.8, 0.80],
        [-0.74, 1.86, -0.31, 0.92, 0.46, 0.0017, 6.9, 0.87],
    ],
);

/// The Toro et al. (1997) mid-continent attenuation model.
#[derive(Debug, Clone, Copy, Default)]
pub struct Toro97;

impl Toro97 {
    fn coefficients(period: f64) -> Result<[f64; 8], MotionError> {
        COEFFICIENTS
            .at(period)
            .ok_or_else(|| MotionError::UnsupportedPeriod {
                model: "toro97".to_owned(),
                period,
            })
    }

    fn apply(c: &[f64; 8], magnitude: f64, distance_km: f64) -> (f64, f64) {
        let dm = magnitude - 6.0;
        let r_m = distance_km.hypot(c[6]);
        let far = (r_m / 100.0).ln().max(0.0);
        let mean = c[0] + c[1] * dm + c[2] * dm * dm - c[3] * r_m.ln() - (c[4] - c[3]) * far
            - c[5] * r_m;
        (mean, c[7])
    }
}

impl GroundMotionModel for Toro97 {
    fn name(&self) -> &'static str {
        "toro97"
    }

    fn distance_metric(&self) -> DistanceMetric {
        DistanceMetric::JoynerBoore
    }

    fn supports_period(&self, period: f64) -> bool {
        COEFFICIENTS.covers(period)
    }

    fn log_mean_sigma(
        &self,
        magnitude: f64,
        distance_km: f64,
        _depth_km: f64,
        period: f64,
    ) -> Result<(f64, f64), MotionError> {
        let c = Self::coefficients(period)?;
        Ok(Self::apply(&c, magnitude, distance_km))
    }

    fn evaluate_grid(
        &self,
        magnitudes: &[f64],
        _depths: &[f64],
        distances: ArrayView2<'_, f64>,
        periods: &[f64],
    ) -> Result<(Array3<f64>, Array3<f64>), MotionError> {
        let rows = periods
            .iter()
            .map(|&p| Self::coefficients(p))
            .collect::<Result<Vec<_>, _>>()?;
        let (sites, events) = distances.dim();
        let shape = (sites, events, periods.len());
        let log_mean = Array3::from_shape_fn(shape, |(i, e, p)| {
            Self::apply(&rows[p], magnitudes[e], distances[[i, e]]).0
        });
        let log_sigma = Array3::from_shape_fn(shape, |(_, _, p)| rows[p][7]);
        Ok((log_mean, log_sigma))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pga_matches_closed_form() {
        let (mean, sigma) = Toro97.log_mean_sigma(6.0, 20.0, 10.0, 0.0).unwrap();
        let r_m = (20.0_f64 * 20.0 + 9.3 * 9.3).sqrt();
        let expected = 2.20 - 1.27 * r_m.ln() - 0.0021 * r_m;
        assert!((mean - expected).abs() < 1e-12);
        assert!((sigma - 0.75).abs() < 1e-12);
    }

    #[test]
    fn far_field_adds_geometric_spreading_term() {
        let (mean, _) = Toro97.log_mean_sigma(6.0, 200.0, 10.0, 0.0).unwrap();
        let r_m = (200.0_f64 * 200.0 + 9.3 * 9.3).sqrt();
        let expected =
            2.20 - 1.27 * r_m.ln() - (1.16 - 1.27) * (r_m / 100.0).ln() - 0.0021 * r_m;
        assert!((mean - expected).abs() < 1e-12);
    }

    #[test]
    fn motion_decays_with_distance_and_grows_with_magnitude() {
        let near = Toro97.log_mean_sigma(6.0, 10.0, 10.0, 0.2).unwrap().0;
        let far = Toro97.log_mean_sigma(6.0, 100.0, 10.0, 0.2).unwrap().0;
        let bigger = Toro97.log_mean_sigma(7.0, 10.0, 10.0, 0.2).unwrap().0;
        assert!(near > far);
        assert!(bigger > near);
    }

    #[test]
    fn long_periods_are_unsupported() {
        assert!(!Toro97.supports_period(5.0));
        assert!(Toro97.log_mean_sigma(6.0, 10.0, 10.0, 5.0).is_err());
    }
}
