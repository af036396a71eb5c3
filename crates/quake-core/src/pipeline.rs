//! The per-site pipeline.
//!
//! Sites are independent, so each is pushed through every stage on its own:
//!
//! 1. evaluate every logic-tree model (log space)
//! 2. discretize the log-normal scatter into weighted spawns
//! 3. return to linear motion, zeroing padded branch slots
//! 4. distance threshold, PGA cutoff, optional smoothing
//! 5. site amplification (optional), then the PGA cutoff again on soil motion
//! 6. weight activity by spawn and collapse the branch axis
//! 7. hazard curve, retained motion, and loss
//!
//! Per-site random streams are seeded from the run seed and the global site
//! index, so results do not depend on how sites are split across ranks.

use ndarray::{Array2, Array3, Array5, Axis, s};
use quake_motion::{
    AmplificationModel, LogicTreeCollapser, MotionError, MultiModelEvaluator,
    SpectralPostProcessor, UncertaintyDiscretizer,
};
use quake_types::{
    EventActivity, EventCatalog, HazardResult, LossResult, MotionRecord, MotionShape,
    MotionTensor, Site,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::debug;

use crate::context::RunContext;
use crate::error::RunError;
use crate::hazard::HazardAggregator;
use crate::loss::{self, LossEngine};
use crate::output::PartialOutput;
use crate::scheduler::SiteBlock;

/// What the pipeline produces for each site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Products {
    /// Aggregate hazard curves.
    pub hazard: bool,
    /// Keep the final linear motion.
    pub motion: bool,
    /// Call the loss engine.
    pub loss: bool,
}

/// One site's results.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteOutput {
    /// `[return_period, period]` intensities.
    pub hazard: Option<Array2<f64>>,
    /// `[spawn, branch, site = 1, event, period]` linear motion.
    pub motion: Option<MotionTensor>,
    /// One loss value per pseudo-event.
    pub loss: Option<ndarray::Array1<f64>>,
}

/// The assembled stages, shared read-only by every site of a rank.
pub struct SitePipeline<'a> {
    evaluator: MultiModelEvaluator,
    discretizer: UncertaintyDiscretizer,
    spectral: SpectralPostProcessor,
    amplification: Option<AmplificationModel>,
    collapser: LogicTreeCollapser,
    aggregator: HazardAggregator,
    loss_engine: Option<&'a dyn LossEngine>,
    bridge_period_indices: Vec<usize>,
    products: Products,
    pga_index: Option<usize>,
}

impl std::fmt::Debug for SitePipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitePipeline")
            .field("evaluator", &self.evaluator)
            .field("discretizer", &self.discretizer)
            .field("amplification", &self.amplification.is_some())
            .field("products", &self.products)
            .finish_non_exhaustive()
    }
}

impl<'a> SitePipeline<'a> {
    /// Assemble a pipeline from its stages.
    pub fn new(
        evaluator: MultiModelEvaluator,
        discretizer: UncertaintyDiscretizer,
        spectral: SpectralPostProcessor,
        collapser: LogicTreeCollapser,
        aggregator: HazardAggregator,
    ) -> Self {
        let pga_index = evaluator.periods().iter().position(|&p| p == 0.0);
        Self {
            evaluator,
            discretizer,
            spectral,
            amplification: None,
            collapser,
            aggregator,
            loss_engine: None,
            bridge_period_indices: Vec::new(),
            products: Products {
                hazard: true,
                motion: false,
                loss: false,
            },
            pga_index,
        }
    }

    /// Enable site amplification.
    #[must_use]
    pub fn with_amplification(mut self, model: AmplificationModel) -> Self {
        self.amplification = Some(model);
        self
    }

    /// Attach a loss engine.
    #[must_use]
    pub fn with_loss_engine(mut self, engine: &'a dyn LossEngine, bridge: Vec<usize>) -> Self {
        self.loss_engine = Some(engine);
        self.bridge_period_indices = bridge;
        self.products.loss = true;
        self
    }

    /// Select hazard and motion products.
    #[must_use]
    pub const fn with_products(mut self, hazard: bool, motion: bool) -> Self {
        self.products.hazard = hazard;
        self.products.motion = motion;
        self
    }

    /// What the pipeline produces.
    pub const fn products(&self) -> Products {
        self.products
    }

    /// Shape of one site's final motion.
    pub fn output_shape(&self, events: usize) -> MotionShape {
        let amp_spawns = self
            .amplification
            .as_ref()
            .map_or(1, AmplificationModel::spawn_count);
        MotionShape {
            spawns: self.discretizer.spawn_count() * amp_spawns,
            branches: self
                .collapser
                .output_branches(self.evaluator.tree().max_branches()),
            sites: 1,
            events,
            periods: self.evaluator.periods().len(),
        }
    }

    /// Push one site through every stage.
    ///
    /// `activity` is the single-spawn base activity shared by all sites.
    pub fn process_site(
        &self,
        ctx: &RunContext,
        site: &Site,
        global_index: usize,
        catalog: &EventCatalog,
        activity: &EventActivity,
    ) -> Result<SiteOutput, RunError> {
        let sites = std::slice::from_ref(site);
        let periods = self.evaluator.periods();
        let log = self.evaluator.evaluate(sites, catalog)?;
        let mut rng = SmallRng::seed_from_u64(ctx.site_seed(global_index));

        let discretized = self
            .discretizer
            .discretize(&log.log_mean, &log.log_sigma, &mut rng)?;
        let mut motion = discretized.log_sample;
        let mut weights = discretized.weights;
        motion.map_inplace(|v| *v = v.exp());
        for ((b, e), &real) in log.real.indexed_iter() {
            if !real {
                motion.data_mut().slice_mut(s![.., b, .., e, ..]).fill(0.0);
            }
        }

        self.spectral
            .process(&mut motion, sites, catalog, self.pga_index)?;

        if let Some(amplification) = &self.amplification {
            let pga_index = self.pga_index.ok_or_else(|| MotionError::DataUnavailable {
                what: "PGA period required for amplification".to_owned(),
            })?;
            let magnitudes = catalog.magnitudes();
            (motion, weights) = amplification.amplify(
                &motion,
                &weights,
                sites,
                &magnitudes,
                periods,
                pga_index,
                &mut rng,
            )?;
            self.spectral.apply_pga_cutoff(&mut motion, pga_index);
        }

        let spawned = activity.with_spawn_weights(&weights)?;
        let motion = self
            .collapser
            .collapse_motion(&motion, self.evaluator.tree(), catalog)?;
        let activity = self.collapser.collapse_activity(&spawned);
        if let Some((spawn, branch, _, event, period)) = motion.first_non_finite() {
            return Err(MotionError::NumericAnomaly {
                model: format!("collapsed branch {branch}, spawn {spawn}"),
                event: quake_types::EventId::new(event),
                site: global_index,
                period,
                quantity: "motion",
            }
            .into());
        }

        let hazard = if self.products.hazard {
            Some(self.aggregator.aggregate_site(&motion, &activity)?)
        } else {
            None
        };
        let loss = match self.loss_engine {
            Some(engine) => Some(self.assess_loss(engine, site, &motion, catalog)?),
            None => None,
        };
        debug!(site = global_index, pseudo_events = activity.data().len(), "Site processed");

        Ok(SiteOutput {
            hazard,
            motion: self.products.motion.then_some(motion),
            loss,
        })
    }

    fn assess_loss(
        &self,
        engine: &dyn LossEngine,
        site: &Site,
        motion: &MotionTensor,
        catalog: &EventCatalog,
    ) -> Result<ndarray::Array1<f64>, RunError> {
        let shape = motion.shape();
        let pseudo_events = shape.pseudo_events();
        let sa = Array2::from_shape_vec(
            (pseudo_events, shape.periods),
            motion.site(0).iter().copied().collect(),
        )
        .map_err(|_shape_err| quake_types::ShapeError::AxisMismatch {
            axis: "pseudo_event",
            expected: pseudo_events,
            actual: motion.site(0).len() / shape.periods.max(1),
        })?;
        let event_magnitudes = catalog.magnitudes();
        let magnitudes: Vec<f64> = (0..shape.spawns * shape.branches)
            .flat_map(|_| event_magnitudes.iter().copied())
            .collect();
        let values = engine.assess(site, sa.view(), &magnitudes, &self.bridge_period_indices)?;
        loss::check_length(&values, pseudo_events)?;
        Ok(values)
    }

    /// Process every site of a block into a partial output.
    pub fn run_block(
        &self,
        ctx: &RunContext,
        block: SiteBlock,
        sites: &[Site],
        catalog: &EventCatalog,
        activity: &EventActivity,
    ) -> Result<PartialOutput, RunError> {
        let shape = self.output_shape(catalog.len());
        let periods = self.evaluator.periods().to_vec();
        let return_periods = self.aggregator.return_periods().to_vec();

        let mut hazard = self.products.hazard.then(|| {
            Array3::zeros((block.len, return_periods.len(), periods.len()))
        });
        let mut motion = self.products.motion.then(|| {
            Array5::zeros((
                block.len,
                shape.spawns,
                shape.branches,
                shape.events,
                shape.periods,
            ))
        });
        let mut loss = self
            .products
            .loss
            .then(|| Array2::zeros((block.len, shape.pseudo_events())));

        for (offset, site) in sites.iter().enumerate() {
            let out = self.process_site(ctx, site, block.start + offset, catalog, activity)?;
            if let (Some(all), Some(one)) = (hazard.as_mut(), out.hazard) {
                all.index_axis_mut(Axis(0), offset).assign(&one);
            }
            if let (Some(all), Some(one)) = (motion.as_mut(), out.motion) {
                all.index_axis_mut(Axis(0), offset)
                    .assign(&one.data().index_axis(MotionTensor::SITE, 0));
            }
            if let (Some(all), Some(one)) = (loss.as_mut(), out.loss) {
                all.index_axis_mut(Axis(0), offset).assign(&one);
            }
        }

        Ok(PartialOutput {
            block,
            hazard: hazard.map(|values| HazardResult {
                return_periods,
                periods: periods.clone(),
                values,
            }),
            motion: motion.map(|values| MotionRecord { periods, values }),
            loss: loss.map(|values| LossResult { values }),
        })
    }
}
