//! Bedrock-to-soil amplification.
//!
//! An [`AmplificationTable`] gives the log-normal distribution of the
//! soil/bedrock ratio per site class, magnitude, bedrock PGA, and period.
//! [`AmplificationModel`] samples that distribution with the same
//! discretisation policies as ground motion, so attenuation and
//! amplification spawns compose: attenuation spawn `i` and amplification
//! spawn `j` become spawn `i * n_amp + j` with weight `w_i * w_j`.
//!
//! Ratios outside the configured bounds are not clipped. The soil value is
//! rescaled directly as `bedrock * bound`.

use std::path::Path;

use ndarray::{Array5, s};
use quake_types::{MotionTensor, Site};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::discretizer::UncertaintyDiscretizer;
use crate::error::MotionError;

/// Allowed range of the soil/bedrock ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplificationBounds {
    /// Smallest allowed ratio.
    #[serde(default = "default_min_factor")]
    pub min_factor: f64,
    /// Largest allowed ratio.
    #[serde(default = "default_max_factor")]
    pub max_factor: f64,
}

impl Default for AmplificationBounds {
    fn default() -> Self {
        Self {
            min_factor: default_min_factor(),
            max_factor: default_max_factor(),
        }
    }
}

const fn default_min_factor() -> f64 {
    0.6
}

const fn default_max_factor() -> f64 {
    10000.0
}

impl AmplificationBounds {
    /// Soil value for a sampled `ratio`, rescaled to the nearest bound when outside.
    pub fn soil(&self, bedrock: f64, ratio: f64) -> f64 {
        if ratio < self.min_factor {
            bedrock * self.min_factor
        } else if ratio > self.max_factor {
            bedrock * self.max_factor
        } else {
            bedrock * ratio
        }
    }
}

/// Tabulated amplification distribution, indexed `[class][magnitude][pga][period]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmplificationTable {
    /// Site class labels.
    pub site_classes: Vec<String>,
    /// Magnitude bin centres.
    pub magnitudes: Vec<f64>,
    /// Bedrock PGA bin centres in g.
    pub pga_bins: Vec<f64>,
    /// Periods in seconds, ascending.
    pub periods: Vec<f64>,
    /// Natural-log mean of the ratio.
    pub ln_mean: Vec<Vec<Vec<Vec<f64>>>>,
    /// Natural-log standard deviation of the ratio.
    pub ln_sigma: Vec<Vec<Vec<Vec<f64>>>>,
}

impl AmplificationTable {
    /// Load and validate a JSON table.
    pub fn load(path: &Path) -> Result<Self, MotionError> {
        let text = std::fs::read_to_string(path).map_err(|err| MotionError::DataUnavailable {
            what: format!("amplification table {}: {err}", path.display()),
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON table.
    pub fn from_json(text: &str) -> Result<Self, MotionError> {
        let table: Self = serde_json::from_str(text).map_err(|err| MotionError::InvalidTable {
            reason: err.to_string(),
        })?;
        table.validate()?;
        Ok(table)
    }

    /// Check every nested dimension matches the axis vectors.
    pub fn validate(&self) -> Result<(), MotionError> {
        if self.magnitudes.is_empty() || self.pga_bins.is_empty() || self.periods.is_empty() {
            return Err(MotionError::InvalidTable {
                reason: "magnitude, PGA, and period axes must be non-empty".to_owned(),
            });
        }
        if self.periods.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MotionError::InvalidTable {
                reason: "periods must be strictly ascending".to_owned(),
            });
        }
        for (name, grid) in [("ln_mean", &self.ln_mean), ("ln_sigma", &self.ln_sigma)] {
            let consistent = grid.len() == self.site_classes.len()
                && grid.iter().all(|by_mag| {
                    by_mag.len() == self.magnitudes.len()
                        && by_mag.iter().all(|by_pga| {
                            by_pga.len() == self.pga_bins.len()
                                && by_pga.iter().all(|row| row.len() == self.periods.len())
                        })
                });
            if !consistent {
                return Err(MotionError::InvalidTable {
                    reason: format!("`{name}` does not match the table axes"),
                });
            }
        }
        Ok(())
    }

    /// `(ln mean, ln sigma)` of the ratio at each of `periods`.
    ///
    /// Uses the nearest magnitude and PGA bins and interpolates linearly in
    /// period, holding the end values outside the tabulated range.
    pub fn lookup(
        &self,
        site_class: &str,
        magnitude: f64,
        pga: f64,
        periods: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>), MotionError> {
        let class = self
            .site_classes
            .iter()
            .position(|c| c == site_class)
            .ok_or_else(|| MotionError::DataUnavailable {
                what: format!("amplification for site class `{site_class}`"),
            })?;
        let m = nearest(&self.magnitudes, magnitude);
        let g = nearest(&self.pga_bins, pga);
        let mean_row = &self.ln_mean[class][m][g];
        let sigma_row = &self.ln_sigma[class][m][g];
        let means = periods
            .iter()
            .map(|&p| interpolate(&self.periods, mean_row, p))
            .collect();
        let sigmas = periods
            .iter()
            .map(|&p| interpolate(&self.periods, sigma_row, p))
            .collect();
        Ok((means, sigmas))
    }
}

fn nearest(centres: &[f64], x: f64) -> usize {
    centres
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - x).abs().total_cmp(&(*b - x).abs()))
        .map_or(0, |(i, _)| i)
}

fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let upper = xs.iter().position(|&p| p >= x);
    match upper {
        None => ys.last().copied().unwrap_or(0.0),
        Some(0) => ys.first().copied().unwrap_or(0.0),
        Some(i) => {
            let t = (x - xs[i - 1]) / (xs[i] - xs[i - 1]);
            ys[i - 1] + t * (ys[i] - ys[i - 1])
        }
    }
}

/// Samples soil motion from bedrock motion.
#[derive(Debug, Clone)]
pub struct AmplificationModel {
    table: AmplificationTable,
    bounds: AmplificationBounds,
    discretizer: UncertaintyDiscretizer,
}

impl AmplificationModel {
    /// Create a model from a validated table.
    pub const fn new(
        table: AmplificationTable,
        bounds: AmplificationBounds,
        discretizer: UncertaintyDiscretizer,
    ) -> Self {
        Self {
            table,
            bounds,
            discretizer,
        }
    }

    /// The ratio bounds.
    pub const fn bounds(&self) -> AmplificationBounds {
        self.bounds
    }

    /// Number of amplification spawns per bedrock spawn.
    pub fn spawn_count(&self) -> usize {
        self.discretizer.spawn_count()
    }

    /// Amplify linear bedrock motion.
    ///
    /// `bedrock` is `[spawn, branch, site, event, period]` with spawn weights
    /// `weights`; `sites` and `magnitudes` run along the site and event axes.
    /// The bedrock PGA is read from period index `pga_index`. Returns soil
    /// motion with `spawns * n_amp` spawns and the composed weights.
    pub fn amplify(
        &self,
        bedrock: &MotionTensor,
        weights: &[f64],
        sites: &[Site],
        magnitudes: &[f64],
        periods: &[f64],
        pga_index: usize,
        rng: &mut impl Rng,
    ) -> Result<(MotionTensor, Vec<f64>), MotionError> {
        bedrock.expect_axis(MotionTensor::SPAWN, weights.len())?;
        bedrock.expect_axis(MotionTensor::SITE, sites.len())?;
        bedrock.expect_axis(MotionTensor::EVENT, magnitudes.len())?;
        bedrock.expect_axis(MotionTensor::PERIOD, periods.len())?;

        let shape = bedrock.shape();
        let n_amp = self.spawn_count();
        let mut soil = Array5::zeros((
            shape.spawns * n_amp,
            shape.branches,
            shape.sites,
            shape.events,
            shape.periods,
        ));

        for (i, site) in sites.iter().enumerate() {
            for (e, &magnitude) in magnitudes.iter().enumerate() {
                for s_att in 0..shape.spawns {
                    for b in 0..shape.branches {
                        let spectrum = bedrock.data().slice(s![s_att, b, i, e, ..]);
                        if spectrum.iter().all(|&v| v == 0.0) {
                            continue;
                        }
                        let pga = spectrum[pga_index];
                        let (means, sigmas) =
                            self.table
                                .lookup(&site.site_class, magnitude, pga, periods)?;
                        for j in 0..n_amp {
                            let mut out = soil.slice_mut(s![s_att * n_amp + j, b, i, e, ..]);
                            for p in 0..periods.len() {
                                let offset = self.discretizer.offset(j, rng);
                                let ratio = (means[p] + offset * sigmas[p]).exp();
                                out[p] = self.bounds.soil(spectrum[p], ratio);
                            }
                        }
                    }
                }
            }
        }

        let amp_weights = self.discretizer.weights();
        let composed = weights
            .iter()
            .flat_map(|w_i| amp_weights.iter().map(move |w_j| w_i * w_j))
            .collect();
        Ok((MotionTensor::from_array(soil), composed))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quake_types::{GeoPoint, MotionShape, SiteId};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::discretizer::VariabilityMethod;

    fn table_json() -> &'static str {
        r#"{
            "site_classes": ["C", "D"],
            "magnitudes": [5.0, 7.0],
            "pga_bins": [0.05, 0.5],
            "periods": [0.0, 1.0],
            "ln_mean": [
                [[[0.1, 0.3], [0.0, 0.2]], [[0.2, 0.4], [0.1, 0.3]]],
                [[[-0.693147, -0.693147], [-0.693147, -0.693147]], [[0.5, 0.7], [0.4, 0.6]]]
            ],
            "ln_sigma": [
                [[[0.3, 0.3], [0.3, 0.3]], [[0.3, 0.3], [0.3, 0.3]]],
                [[[0.0, 0.0], [0.0, 0.0]], [[0.3, 0.3], [0.3, 0.3]]]
            ]
        }"#
    }

    fn site(class: &str) -> Site {
        Site::new(SiteId::new(0), GeoPoint::new(-33.0, 151.0), class)
    }

    #[test]
    fn ratio_below_minimum_rescales_to_the_bound_exactly() {
        let bounds = AmplificationBounds {
            min_factor: 0.6,
            max_factor: 5.0,
        };
        let bedrock = 0.137_f64;
        let soil = bounds.soil(bedrock, 0.5);
        assert_eq!(soil.to_bits(), (bedrock * 0.6).to_bits());
        assert_eq!(bounds.soil(bedrock, 8.0).to_bits(), (bedrock * 5.0).to_bits());
    }

    #[test]
    fn lookup_uses_nearest_bins_and_interpolates_period() {
        let table = AmplificationTable::from_json(table_json()).unwrap();
        let (means, sigmas) = table.lookup("C", 6.8, 0.4, &[0.5, 2.0]).unwrap();
        assert!((means[0] - 0.2).abs() < 1e-12);
        assert!((means[1] - 0.3).abs() < 1e-12);
        assert!((sigmas[0] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn unknown_class_is_unavailable_data() {
        let table = AmplificationTable::from_json(table_json()).unwrap();
        assert!(matches!(
            table.lookup("E", 6.0, 0.1, &[0.0]),
            Err(MotionError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn inconsistent_table_is_rejected() {
        let mut table: AmplificationTable = serde_json::from_str(table_json()).unwrap();
        table.ln_sigma.pop();
        assert!(matches!(
            table.validate(),
            Err(MotionError::InvalidTable { .. })
        ));
    }

    #[test]
    fn clamped_amplification_through_the_model() {
        // Class D at small magnitude has ratio exp(-0.693147), about 0.5, with no scatter.
        let table = AmplificationTable::from_json(table_json()).unwrap();
        let model = AmplificationModel::new(
            table,
            AmplificationBounds {
                min_factor: 0.6,
                max_factor: 10.0,
            },
            UncertaintyDiscretizer::new(VariabilityMethod::MeanOnly, 2.5),
        );
        let shape = MotionShape {
            spawns: 1,
            branches: 1,
            sites: 1,
            events: 1,
            periods: 2,
        };
        let bedrock = MotionTensor::from_vec(shape, vec![0.2, 0.1]).unwrap();
        let (soil, weights) = model
            .amplify(
                &bedrock,
                &[1.0],
                &[site("D")],
                &[5.0],
                &[0.0, 1.0],
                0,
                &mut SmallRng::seed_from_u64(0),
            )
            .unwrap();
        assert_eq!(weights, vec![1.0]);
        assert_eq!(soil.get(0, 0, 0, 0, 0).to_bits(), (0.2_f64 * 0.6).to_bits());
        assert_eq!(soil.get(0, 0, 0, 0, 1).to_bits(), (0.1_f64 * 0.6).to_bits());
    }

    #[test]
    fn spawns_compose_multiplicatively() {
        let table = AmplificationTable::from_json(table_json()).unwrap();
        let model = AmplificationModel::new(
            table,
            AmplificationBounds::default(),
            UncertaintyDiscretizer::new(VariabilityMethod::Spawn { bins: 3 }, 2.0),
        );
        let shape = MotionShape {
            spawns: 2,
            branches: 1,
            sites: 1,
            events: 1,
            periods: 2,
        };
        let bedrock = MotionTensor::filled(shape, 0.1);
        let (soil, weights) = model
            .amplify(
                &bedrock,
                &[0.25, 0.75],
                &[site("C")],
                &[6.0],
                &[0.0, 1.0],
                0,
                &mut SmallRng::seed_from_u64(0),
            )
            .unwrap();
        assert_eq!(soil.shape().spawns, 6);
        assert_eq!(weights.len(), 6);
        let total: f64 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        let amp = model.discretizer.weights();
        assert!((weights[4] - 0.75 * amp[1]).abs() < 1e-12);
    }
}
