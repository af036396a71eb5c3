//! Multi-model ground-motion evaluation.
//!
//! [`MultiModelEvaluator`] evaluates every model of the logic tree for every
//! `(site, event, period)` cell and lays the results out on the branch axis:
//! branch slot `b` of event `e` holds the model of branch `b` of the event's
//! source. Slots beyond a source's own branch count are padding; they are
//! left at zero and flagged in [`LogMotion::real`].
//!
//! The evaluator never reduces across branches. Magnitudes are checked before
//! anything is evaluated; a non-finite model output is reported with the
//! offending model and event.

use std::sync::Arc;

use ndarray::{Array2, Array3, Array5, s};
use quake_types::{EventCatalog, LogicTree, MotionTensor, Site};
use tracing::debug;

use crate::distance::DistanceMetric;
use crate::error::MotionError;
use crate::models::GroundMotionModel;

/// Log-space ground motion for a block of sites.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMotion {
    /// `[1, branch, site, event, period]` natural-log mean in g.
    pub log_mean: MotionTensor,
    /// `[1, branch, site, event, period]` natural-log standard deviation.
    pub log_sigma: MotionTensor,
    /// `[branch, event]`: whether the slot is a real branch of the event's source.
    pub real: Array2<bool>,
}

/// Evaluates the ground-motion models of a logic tree.
#[derive(Debug, Clone)]
pub struct MultiModelEvaluator {
    models: Vec<Arc<dyn GroundMotionModel>>,
    tree: LogicTree,
    periods: Vec<f64>,
}

impl MultiModelEvaluator {
    /// Create an evaluator; `models` is indexed by [`ModelId`](quake_types::ModelId).
    ///
    /// Fails if a branch refers to a model that is not supplied or a model
    /// does not cover every period.
    pub fn new(
        models: Vec<Arc<dyn GroundMotionModel>>,
        tree: LogicTree,
        periods: Vec<f64>,
    ) -> Result<Self, MotionError> {
        for source_index in 0..tree.sources() {
            let Some(set) = tree.branches(source_index.into()) else {
                continue;
            };
            for (branch, b) in set.iter().enumerate() {
                let model = models.get(b.model.index()).ok_or(MotionError::MissingModel {
                    source_index,
                    branch,
                    model: b.model.index(),
                })?;
                if let Some(&period) = periods.iter().find(|&&p| !model.supports_period(p)) {
                    return Err(MotionError::UnsupportedPeriod {
                        model: model.name().to_owned(),
                        period,
                    });
                }
            }
        }
        Ok(Self {
            models,
            tree,
            periods,
        })
    }

    /// The spectral periods evaluated.
    pub fn periods(&self) -> &[f64] {
        &self.periods
    }

    /// The logic tree.
    pub const fn tree(&self) -> &LogicTree {
        &self.tree
    }

    /// Evaluate every branch model for `sites` against the whole catalog.
    pub fn evaluate(&self, sites: &[Site], catalog: &EventCatalog) -> Result<LogMotion, MotionError> {
        for event in catalog {
            if !(event.magnitude.is_finite() && event.magnitude > 0.0) {
                return Err(MotionError::DegenerateMagnitude {
                    event: event.id,
                    magnitude: event.magnitude,
                });
            }
        }

        let magnitudes = catalog.magnitudes();
        let depths: Vec<f64> = catalog.iter().map(|e| e.depth_km).collect();
        let branches = self.tree.max_branches();
        let dim = (1, branches, sites.len(), catalog.len(), self.periods.len());
        let mut log_mean = Array5::zeros(dim);
        let mut log_sigma = Array5::zeros(dim);
        let mut real = Array2::from_elem((branches, catalog.len()), false);

        let mut distances: Vec<(DistanceMetric, Array2<f64>)> = Vec::new();
        for (model_index, model) in self.models.iter().enumerate() {
            if !self.model_in_use(model_index) {
                continue;
            }
            let metric = model.distance_metric();
            let slot = match distances.iter().position(|(m, _)| *m == metric) {
                Some(slot) => slot,
                None => {
                    distances.push((metric, metric.matrix(sites, catalog)));
                    distances.len() - 1
                }
            };
            let (mean, sigma) = model.evaluate_grid(
                &magnitudes,
                &depths,
                distances[slot].1.view(),
                &self.periods,
            )?;

            for event in catalog {
                let Some(set) = self.tree.branches(event.source) else {
                    continue;
                };
                let e = event.id.index();
                for (b, branch) in set.iter().enumerate() {
                    if branch.model.index() != model_index {
                        continue;
                    }
                    check_finite(model.as_ref(), event.id, &mean, &sigma, e)?;
                    log_mean
                        .slice_mut(s![0, b, .., e, ..])
                        .assign(&mean.slice(s![.., e, ..]));
                    log_sigma
                        .slice_mut(s![0, b, .., e, ..])
                        .assign(&sigma.slice(s![.., e, ..]));
                    real[[b, e]] = true;
                }
            }
            debug!(model = model.name(), sites = sites.len(), "Model evaluated");
        }

        Ok(LogMotion {
            log_mean: MotionTensor::from_array(log_mean),
            log_sigma: MotionTensor::from_array(log_sigma),
            real,
        })
    }

    fn model_in_use(&self, model_index: usize) -> bool {
        (0..self.tree.sources()).any(|source| {
            self.tree
                .branches(source.into())
                .is_some_and(|set| set.iter().any(|b| b.model.index() == model_index))
        })
    }
}

fn check_finite(
    model: &dyn GroundMotionModel,
    event: quake_types::EventId,
    mean: &Array3<f64>,
    sigma: &Array3<f64>,
    e: usize,
) -> Result<(), MotionError> {
    let outputs = [("log_mean", mean), ("log_sigma", sigma)];
    for (quantity, values) in outputs {
        let lane = values.slice(s![.., e, ..]);
        if let Some(((site, period), _)) = lane.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(MotionError::NumericAnomaly {
                model: model.name().to_owned(),
                event,
                site,
                period,
                quantity,
            });
        }
    }
    Ok(())
}
