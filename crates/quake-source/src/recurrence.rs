//! Truncated Gutenberg-Richter magnitude-frequency law.
//!
//! A source emits `a_min` events per year at or above `min_magnitude`, with
//! magnitudes distributed exponentially (slope `b`) and truncated at
//! `max_magnitude`. With `beta = b ln 10` the annual rate of events in
//! `[lo, hi]` is
//!
//! ```text
//! a_min * (exp(-beta (lo - m0)) - exp(-beta (hi - m0))) / (1 - exp(-beta (mmax - m0)))
//! ```
//!
//! A source may carry several co-located recurrence models; their weights
//! must sum to 1.

use std::f64::consts::LN_10;

use quake_types::normalize_weights;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Slopes below this are treated as a flat (uniform) distribution.
const FLAT_BETA: f64 = 1e-12;

/// Truncated Gutenberg-Richter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GutenbergRichter {
    /// Lower truncation magnitude `m0`.
    pub min_magnitude: f64,
    /// Upper truncation magnitude `mmax`.
    pub max_magnitude: f64,
    /// Annual number of events at or above `min_magnitude`.
    pub a_min: f64,
    /// Gutenberg-Richter b-value.
    pub b_value: f64,
    /// Weight of this model among co-located models.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

const fn default_weight() -> f64 {
    1.0
}

impl GutenbergRichter {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), SourceError> {
        let finite = [self.min_magnitude, self.max_magnitude, self.a_min, self.b_value]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(SourceError::InvalidRecurrence {
                reason: "parameters must be finite".to_owned(),
            });
        }
        if self.min_magnitude >= self.max_magnitude {
            return Err(SourceError::InvalidRecurrence {
                reason: format!(
                    "min_magnitude {} must be below max_magnitude {}",
                    self.min_magnitude, self.max_magnitude
                ),
            });
        }
        if self.a_min < 0.0 {
            return Err(SourceError::InvalidRecurrence {
                reason: format!("a_min {} must be non-negative", self.a_min),
            });
        }
        if self.b_value < 0.0 {
            return Err(SourceError::InvalidRecurrence {
                reason: format!("b_value {} must be non-negative", self.b_value),
            });
        }
        Ok(())
    }

    /// `b ln 10`.
    pub fn beta(&self) -> f64 {
        self.b_value * LN_10
    }

    /// Cumulative probability that an event magnitude is at most `m`.
    pub fn cdf(&self, magnitude: f64) -> f64 {
        let m = magnitude.clamp(self.min_magnitude, self.max_magnitude);
        let span = self.max_magnitude - self.min_magnitude;
        let beta = self.beta();
        if beta < FLAT_BETA {
            return (m - self.min_magnitude) / span;
        }
        (1.0 - (-beta * (m - self.min_magnitude)).exp()) / (1.0 - (-beta * span).exp())
    }

    /// Magnitude at cumulative probability `u` in `[0, 1]`.
    pub fn inverse_cdf(&self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        let span = self.max_magnitude - self.min_magnitude;
        let beta = self.beta();
        if beta < FLAT_BETA {
            return self.min_magnitude + u * span;
        }
        let tail = 1.0 - (-beta * span).exp();
        self.min_magnitude - (1.0 - u * tail).ln() / beta
    }

    /// Expected annual number of events with magnitude in `[lo, hi]`.
    ///
    /// Bounds are clipped to the truncation range; an empty intersection
    /// contributes nothing.
    pub fn rate_between(&self, lo: f64, hi: f64) -> f64 {
        let lo = lo.max(self.min_magnitude);
        let hi = hi.min(self.max_magnitude);
        if hi <= lo {
            return 0.0;
        }
        self.a_min * (self.cdf(hi) - self.cdf(lo))
    }

    /// Expected annual number of events at or above `m`.
    pub fn rate_above(&self, magnitude: f64) -> f64 {
        self.rate_between(magnitude, self.max_magnitude)
    }
}

/// The co-located recurrence models of one source, with normalised weights.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecurrenceSet {
    models: Vec<GutenbergRichter>,
    weights: Vec<f64>,
}

impl RecurrenceSet {
    /// Validate every model and normalise the weights.
    ///
    /// Fails if any model is inconsistent or the weights do not sum to 1
    /// within the input tolerance.
    pub fn new(source_name: &str, models: Vec<GutenbergRichter>) -> Result<Self, SourceError> {
        for model in &models {
            model.validate()?;
        }
        let raw: Vec<f64> = models.iter().map(|m| m.weight).collect();
        let weights = normalize_weights(&raw).map_err(|source| SourceError::Weights {
            source_name: source_name.to_owned(),
            source,
        })?;
        Ok(Self { models, weights })
    }

    /// A set with no models (scenario sources).
    pub const fn none() -> Self {
        Self {
            models: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// The models.
    pub fn models(&self) -> &[GutenbergRichter] {
        &self.models
    }

    /// Normalised weights, parallel to [`Self::models`].
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the set has no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Weighted annual rate of events in `[lo, hi]` across all models.
    pub fn rate_between(&self, lo: f64, hi: f64) -> f64 {
        self.models
            .iter()
            .zip(&self.weights)
            .map(|(m, w)| w * m.rate_between(lo, hi))
            .sum()
    }

    /// Largest truncation magnitude across models.
    pub fn max_magnitude(&self) -> Option<f64> {
        self.models.iter().map(|m| m.max_magnitude).reduce(f64::max)
    }

    /// Smallest lower-truncation magnitude across models.
    pub fn min_magnitude(&self) -> Option<f64> {
        self.models.iter().map(|m| m.min_magnitude).reduce(f64::min)
    }

    /// Split `total` events among the models in proportion to weight.
    ///
    /// Uses largest-remainder rounding so the counts always sum to `total`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn split_counts(&self, total: usize) -> Vec<usize> {
        let exact: Vec<f64> = self.weights.iter().map(|w| w * total as f64).collect();
        let mut counts: Vec<usize> = exact.iter().map(|x| x.floor() as usize).collect();
        let assigned: usize = counts.iter().sum();

        let mut order: Vec<usize> = (0..exact.len()).collect();
        order.sort_by(|&a, &b| {
            let ra = exact[a] - exact[a].floor();
            let rb = exact[b] - exact[b].floor();
            rb.total_cmp(&ra).then(a.cmp(&b))
        });
        for &index in order.iter().take(total.saturating_sub(assigned)) {
            counts[index] += 1;
        }
        counts
    }
}
