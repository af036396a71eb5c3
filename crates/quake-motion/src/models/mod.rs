//! Ground-motion prediction equations.
//!
//! A [`GroundMotionModel`] predicts the log-normal distribution of spectral
//! acceleration (in g) from magnitude, distance, and depth. Built-in models
//! tabulate their coefficients per period and interpolate linearly between
//! tabulated periods; a period outside the table is not supported.
//!
//! [`ModelRegistry`] maps configured names to model instances.

mod atkinson_boore95;
mod table;
mod toro97;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array3, ArrayView2};

pub use atkinson_boore95::AtkinsonBoore95;
pub use table::CoefficientTable;
pub use toro97::Toro97;

use crate::distance::DistanceMetric;
use crate::error::MotionError;

/// A ground-motion prediction equation.
pub trait GroundMotionModel: fmt::Debug + Send + Sync {
    /// Registered name.
    fn name(&self) -> &'static str;

    /// The distance the equation is regressed against.
    fn distance_metric(&self) -> DistanceMetric;

    /// Whether the model has coefficients for `period` (seconds; 0 is PGA).
    fn supports_period(&self, period: f64) -> bool;

    /// `(ln mean, ln sigma)` of spectral acceleration in g.
    fn log_mean_sigma(
        &self,
        magnitude: f64,
        distance_km: f64,
        depth_km: f64,
        period: f64,
    ) -> Result<(f64, f64), MotionError>;

    /// Evaluate a whole `[site, event, period]` grid.
    ///
    /// `distances` is `[site, event]`; `magnitudes` and `depths` are per
    /// event. Implementations may override this to resolve coefficients once
    /// per period instead of once per cell.
    fn evaluate_grid(
        &self,
        magnitudes: &[f64],
        depths: &[f64],
        distances: ArrayView2<'_, f64>,
        periods: &[f64],
    ) -> Result<(Array3<f64>, Array3<f64>), MotionError> {
        let (sites, events) = distances.dim();
        let shape = (sites, events, periods.len());
        let mut log_mean = Array3::zeros(shape);
        let mut log_sigma = Array3::zeros(shape);
        for ((i, e, p), cell) in log_mean.indexed_iter_mut() {
            let (mean, sigma) =
                self.log_mean_sigma(magnitudes[e], distances[[i, e]], depths[e], periods[p])?;
            *cell = mean;
            log_sigma[[i, e, p]] = sigma;
        }
        Ok((log_mean, log_sigma))
    }
}

/// Named collection of available ground-motion models.
#[derive(Clone)]
pub struct ModelRegistry {
    models: BTreeMap<&'static str, Arc<dyn GroundMotionModel>>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in model.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(Toro97));
        registry.register(Arc::new(AtkinsonBoore95));
        registry
    }

    /// Add (or replace) a model under its own name.
    pub fn register(&mut self, model: Arc<dyn GroundMotionModel>) {
        self.models.insert(model.name(), model);
    }

    /// Look a model up by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn GroundMotionModel>, MotionError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| MotionError::UnknownModel {
                name: name.to_owned(),
            })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.models.keys().copied().collect()
    }

    /// Check that a model covers every requested period.
    pub fn check_periods(&self, name: &str, periods: &[f64]) -> Result<(), MotionError> {
        let model = self.resolve(name)?;
        match periods.iter().find(|&&p| !model.supports_period(p)) {
            Some(&period) => Err(MotionError::UnsupportedPeriod {
                model: name.to_owned(),
                period,
            }),
            None => Ok(()),
        }
    }
}
