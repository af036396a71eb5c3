//! Atkinson and Boore (1995), eastern North America, hypocentral distance.
//!
//! ```text
//! log10 Y = c1 + c2 (M - 6) + c3 (M - 6)^2 - log10(R) - c4 R
//! ```
//!
//! `Y` is pseudo-acceleration in cm/s^2, converted here to g. Distances
//! below 1 km are treated as 1 km.

use std::f64::consts::LN_10;

use super::GroundMotionModel;
use super::table::CoefficientTable;
use crate::distance::DistanceMetric;
use crate::error::MotionError;

/// Standard gravity in cm/s^2.
const GRAVITY_CM_S2: f64 = 981.0;

/// Columns: c1, c2, c3, c4, log10 sigma.
const COEFFICIENTS: CoefficientTable<5> = CoefficientTable::new(
    &[0.0, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0],
    &[
        [3.79, 0.298, -0.0536, 0.00135, 0.23],
        [3.99, 0.256, -0.0430, 0.00166, 0.25],
        [3.83, 0.314, -0.0560, 0.00134, 0.24],
        [3.54, 0.383, -0.0710, 0.00093, 0.24],
        [2.87, 0.538, -0.1040, 0.00040, 0.25],
        [2.28, 0.666, -0.1310, 0.00020, 0.27],
        [1.63, 0.753, -0.1460, 0.00000, 0.30],
    ],
);

/// The Atkinson and Boore (1995) eastern North America model.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtkinsonBoore95;

impl GroundMotionModel for AtkinsonBoore95 {
    fn name(&self) -> &'static str {
        "atkinson_boore95"
    }

    fn distance_metric(&self) -> DistanceMetric {
        DistanceMetric::Hypocentral
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
        let c = COEFFICIENTS
            .at(period)
            .ok_or_else(|| MotionError::UnsupportedPeriod {
                model: self.name().to_owned(),
                period,
            })?;
        let dm = magnitude - 6.0;
        let r = distance_km.max(1.0);
        let log10_cm = c[0] + c[1] * dm + c[2] * dm * dm - r.log10() - c[3] * r;
        let mean = log10_cm * LN_10 - GRAVITY_CM_S2.ln();
        Ok((mean, c[4] * LN_10))
    }
}
