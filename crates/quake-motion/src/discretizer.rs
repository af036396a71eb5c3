//! Discretisation of log-normal uncertainty into weighted spawns.
//!
//! Each ground-motion cell is a log-normal distribution `(ln mean, ln sigma)`.
//! [`UncertaintyDiscretizer`] turns it into one or more realised log values:
//!
//! - [`VariabilityMethod::MeanOnly`]: one spawn at the mean, weight 1.
//! - [`VariabilityMethod::Spawn`]: `bins` equal-width bins on
//!   `[-w, +w]` standard deviations; each spawn sits at a bin midpoint and is
//!   weighted by the normal probability mass of its bin, renormalised to 1.
//! - [`VariabilityMethod::Random`]: one spawn drawn from the normal
//!   distribution truncated at `+-w`. Random sampling is not reproducible as
//!   a weighting and must not feed hazard aggregation.
//! - [`VariabilityMethod::PlusSigma`] / [`VariabilityMethod::MinusSigma`]:
//!   one spawn at `mean +- n sigma`.
//!
//! Spawning adds the spawn axis; the matching event activity is multiplied
//! by the spawn weights (see [`EventActivity::with_spawn_weights`]).
//!
//! [`EventActivity::with_spawn_weights`]: quake_types::EventActivity::with_spawn_weights

use std::f64::consts::{FRAC_1_SQRT_2, TAU};

use ndarray::{Array5, Axis};
use quake_types::{MotionTensor, ShapeError};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// Maximum draws before a truncated normal sample falls back to the bound.
const MAX_TRUNCATION_DRAWS: usize = 1000;

/// How continuous uncertainty is realised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VariabilityMethod {
    /// The mean only.
    #[default]
    MeanOnly,
    /// Deterministic equal-width spawning.
    Spawn {
        /// Number of spawn bins.
        bins: usize,
    },
    /// Truncated-normal random sampling.
    Random,
    /// A fixed number of standard deviations above the mean.
    PlusSigma {
        /// Number of standard deviations.
        n: f64,
    },
    /// A fixed number of standard deviations below the mean.
    MinusSigma {
        /// Number of standard deviations.
        n: f64,
    },
}

impl VariabilityMethod {
    /// Whether the method yields a reproducible weighting.
    pub const fn is_deterministic(self) -> bool {
        !matches!(self, Self::Random)
    }

    /// Number of spawns produced per cell.
    pub const fn spawn_count(self) -> usize {
        match self {
            Self::Spawn { bins } => bins,
            Self::MeanOnly | Self::Random | Self::PlusSigma { .. } | Self::MinusSigma { .. } => 1,
        }
    }
}

/// Realised log values and their spawn weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Discretized {
    /// `[spawn, branch, site, event, period]` realised log motion.
    pub log_sample: MotionTensor,
    /// Weight of each spawn; sums to 1.
    pub weights: Vec<f64>,
}

/// Converts `(ln mean, ln sigma)` into weighted spawns.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyDiscretizer {
    method: VariabilityMethod,
    truncation_sigmas: f64,
    offsets: Vec<f64>,
    weights: Vec<f64>,
}

impl UncertaintyDiscretizer {
    /// Build a discretizer, precomputing deterministic spawn offsets and weights.
    pub fn new(method: VariabilityMethod, truncation_sigmas: f64) -> Self {
        let (offsets, weights) = match method {
            VariabilityMethod::MeanOnly | VariabilityMethod::Random => (vec![0.0], vec![1.0]),
            VariabilityMethod::PlusSigma { n } => (vec![n], vec![1.0]),
            VariabilityMethod::MinusSigma { n } => (vec![-n], vec![1.0]),
            VariabilityMethod::Spawn { bins } => spawn_bins(bins, truncation_sigmas),
        };
        Self {
            method,
            truncation_sigmas,
            offsets,
            weights,
        }
    }

    /// The configured method.
    pub const fn method(&self) -> VariabilityMethod {
        self.method
    }

    /// Number of spawns per cell.
    pub fn spawn_count(&self) -> usize {
        self.weights.len()
    }

    /// Spawn weights; they sum to 1.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Offset in standard deviations for spawn `index`.
    ///
    /// Random sampling draws a fresh truncated-normal offset on every call.
    pub fn offset(&self, index: usize, rng: &mut impl Rng) -> f64 {
        match self.method {
            VariabilityMethod::Random => truncated_normal(self.truncation_sigmas, rng),
            _ => self.offsets[index],
        }
    }

    /// Realise every cell of a single-spawn `(ln mean, ln sigma)` pair.
    pub fn discretize(
        &self,
        log_mean: &MotionTensor,
        log_sigma: &MotionTensor,
        rng: &mut impl Rng,
    ) -> Result<Discretized, MotionError> {
        log_mean.expect_axis(MotionTensor::SPAWN, 1)?;
        let shape = log_mean.shape();
        if log_sigma.shape() != shape {
            return Err(ShapeError::AxisMismatch {
                axis: "period",
                expected: shape.len(),
                actual: log_sigma.shape().len(),
            }
            .into());
        }

        let mean = log_mean.data().index_axis(Axis(0), 0);
        let sigma = log_sigma.data().index_axis(Axis(0), 0);
        let spawns = self.spawn_count();
        let mut out = Array5::zeros((
            spawns,
            shape.branches,
            shape.sites,
            shape.events,
            shape.periods,
        ));

        for (s, mut lane) in out.axis_iter_mut(Axis(0)).enumerate() {
            if let VariabilityMethod::MeanOnly = self.method {
                lane.assign(&mean);
                continue;
            }
            for (cell, (&mu, &sd)) in lane.iter_mut().zip(mean.iter().zip(sigma.iter())) {
                *cell = mu + self.offset(s, rng) * sd;
            }
        }

        Ok(Discretized {
            log_sample: MotionTensor::from_array(out),
            weights: self.weights.clone(),
        })
    }
}

/// Midpoints and normalised probability masses of `bins` equal-width bins on `[-w, w]`.
fn spawn_bins(bins: usize, w: f64) -> (Vec<f64>, Vec<f64>) {
    let width = 2.0 * w / bins as f64;
    let mut offsets = Vec::with_capacity(bins);
    let mut masses = Vec::with_capacity(bins);
    for k in 0..bins {
        let lo = -w + width * k as f64;
        let hi = lo + width;
        offsets.push(lo + width / 2.0);
        masses.push(normal_cdf(hi) - normal_cdf(lo));
    }
    let total: f64 = masses.iter().sum();
    let weights = if total > 0.0 {
        masses.iter().map(|m| m / total).collect()
    } else {
        vec![1.0 / bins as f64; bins]
    };
    (offsets, weights)
}

/// Standard normal cumulative distribution function.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x * FRAC_1_SQRT_2))
}

/// Error function, Abramowitz and Stegun 7.1.26 (absolute error below 1.5e-7).
pub fn erf(x: f64) -> f64 {
    const P: f64 = 0.327_591_1;
    const A: [f64; 5] = [
        0.254_829_592,
        -0.284_496_736,
        1.421_413_741,
        -1.453_152_027,
        1.061_405_429,
    ];
    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = A.iter().rev().fold(0.0, |acc, &a| acc * t + a) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal draw via Box-Muller.
pub fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Standard normal draw rejected outside `[-w, w]`.
fn truncated_normal(w: f64, rng: &mut impl Rng) -> f64 {
    if w <= 0.0 {
        return 0.0;
    }
    for _ in 0..MAX_TRUNCATION_DRAWS {
        let z = standard_normal(rng);
        if z.abs() <= w {
            return z;
        }
    }
    0.0
}
