//! Empirical rupture dimensions from magnitude.
//!
//! Rupture area and width follow the all-slip-type regressions of Wells and
//! Coppersmith (1994):
//!
//! ```text
//! area  = 10^(M - 4.02)            km^2
//! width = 10^(-1.01 + 0.32 M)      km, capped at thickness / sin(dip)
//! length = area / width            km, optionally capped
//! ```
//!
//! Capping the width keeps the rupture inside the seismogenic layer; the
//! length then grows to preserve the area.

use serde::{Deserialize, Serialize};

/// Parameters for rupture scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Default seismogenic thickness in kilometres, used when a source does
    /// not define its own depth range.
    #[serde(default = "default_thickness_km")]
    pub seismogenic_thickness_km: f64,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            seismogenic_thickness_km: default_thickness_km(),
        }
    }
}

const fn default_thickness_km() -> f64 {
    15.0
}

/// Rupture area in square kilometres.
pub fn rupture_area_km2(magnitude: f64) -> f64 {
    10.0_f64.powf(magnitude - 4.02)
}

/// Unconstrained rupture width in kilometres.
pub fn rupture_width_km(magnitude: f64) -> f64 {
    10.0_f64.powf(-1.01 + 0.32 * magnitude)
}

/// Largest width that fits a layer of `thickness_km` at `dip_deg`.
pub fn max_width_km(thickness_km: f64, dip_deg: f64) -> f64 {
    let sin_dip = dip_deg.to_radians().sin();
    if sin_dip <= f64::EPSILON {
        return f64::INFINITY;
    }
    thickness_km / sin_dip
}

/// `(length_km, width_km)` of a rupture.
///
/// The width is capped to the seismogenic layer; the length preserves the
/// empirical area and is then capped at `max_length_km` when given (fault
/// ruptures cannot outrun their trace).
pub fn rupture_dimensions(
    magnitude: f64,
    dip_deg: f64,
    thickness_km: f64,
    max_length_km: Option<f64>,
) -> (f64, f64) {
    let area = rupture_area_km2(magnitude);
    let width = rupture_width_km(magnitude).min(max_width_km(thickness_km, dip_deg));
    let mut length = area / width;
    if let Some(cap) = max_length_km {
        length = length.min(cap);
    }
    (length, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_six_dimensions() {
        let (length, width) = rupture_dimensions(6.0, 90.0, 100.0, None);
        let area = 10.0_f64.powf(1.98);
        let expected_width = 10.0_f64.powf(0.91);
        assert!((width - expected_width).abs() < 1e-9);
        assert!((length * width - area).abs() < 1e-9);
    }

    #[test]
    fn width_is_capped_by_layer() {
        // Unconstrained width is about 24.5 km; a 10 km layer at 30 degrees allows 20 km.
        let (length, width) = rupture_dimensions(7.5, 30.0, 10.0, None);
        assert!((width - 20.0).abs() < 1e-9);
        assert!((length * width - rupture_area_km2(7.5)).abs() < 1e-6);
    }

    #[test]
    fn length_is_capped_by_trace() {
        let (length, _) = rupture_dimensions(7.5, 90.0, 15.0, Some(20.0));
        assert!((length - 20.0).abs() < 1e-9);
    }
}
