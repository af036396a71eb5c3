//! Run orchestration.
//!
//! Every rank prepares the run on its own: it validates the configuration,
//! builds sources and the logic tree, and generates the catalog from the
//! seeded stream. Preparation is a pure function of the configuration, so
//! all ranks hold identical inputs without exchanging them. After a barrier
//! the root prepares the output directory, each rank processes its site
//! block, and the root gathers and stitches the partial outputs. A rank whose
//! preparation fails still reaches the barrier and reports its failure
//! through the gather.
//!
//! [`run`] drives one rank over any [`Communicator`]; [`run_threaded`] runs
//! `run.ranks` ranks on scoped threads connected by channels.

use std::collections::BTreeMap;
use std::sync::Arc;

use quake_motion::{
    AmplificationModel, AmplificationTable, GroundMotionModel, LogicTreeCollapser, MotionError,
    ModelRegistry, MultiModelEvaluator, UncertaintyDiscretizer,
};
use quake_source::{
    EventGenerator, GenerationMode, Source, SourceDefinition, SourceError, build_event_activity,
};
use quake_types::{
    BranchSet, EventActivity, EventCatalog, LogicTree, ModelId, Site, SourceId,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::comm::{ChannelCommunicator, Communicator, RankReport, SingleRank};
use crate::config::{HazardConfig, RunMode};
use crate::context::RunContext;
use crate::error::RunError;
use crate::hazard::HazardAggregator;
use crate::loss::LossEngine;
use crate::output::RunOutput;
use crate::pipeline::SitePipeline;
use crate::scheduler::SiteBlockScheduler;

/// Inputs shared by every site of a run, built once per rank.
#[derive(Debug)]
pub struct PreparedRun {
    /// Sites in global order.
    pub sites: Vec<Site>,
    /// Sources with their events assigned.
    pub sources: Vec<Source>,
    /// The generated catalog.
    pub catalog: EventCatalog,
    /// Single-spawn base activity, `[1, branch, event]`.
    pub activity: EventActivity,
    /// Per-source ground-motion branches.
    pub tree: LogicTree,
    /// Models indexed by [`ModelId`].
    pub models: Vec<Arc<dyn GroundMotionModel>>,
    /// Amplification model, when enabled.
    pub amplification: Option<AmplificationModel>,
}

/// Validate the configuration and build every run-wide input.
pub fn prepare(config: &HazardConfig, registry: &ModelRegistry) -> Result<PreparedRun, RunError> {
    config.validate(registry)?;
    let sites = config.resolve_sites()?;

    let (models, branch_sets) = resolve_branches(&config.sources, registry)?;
    let sources = config
        .sources
        .iter()
        .zip(&branch_sets)
        .enumerate()
        .map(|(i, (def, branches))| Source::new(SourceId::new(i), def, branches.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    let tree = LogicTree::new(branch_sets);

    let mode = match config.run.mode {
        RunMode::Hazard => GenerationMode::Synthetic,
        RunMode::Scenario => GenerationMode::Scenario,
    };
    let generator = EventGenerator::new(
        config.generation.scaling.clone(),
        config.generation.magnitude_sampling,
    );
    let mut rng = SmallRng::seed_from_u64(config.run.seed);
    let catalog = generator.generate(mode, &sources, &mut rng)?;
    let activity =
        build_event_activity(&sources, &catalog, config.generation.magnitude_bins, &tree)?;

    let amplification = if config.amplification.enabled {
        let path = config.amplification.table.as_ref().ok_or_else(|| {
            MotionError::DataUnavailable {
                what: "amplification.table is required when amplification is enabled".to_owned(),
            }
        })?;
        let table = AmplificationTable::load(path)?;
        let discretizer = UncertaintyDiscretizer::new(
            config.amplification.variability,
            config.ground_motion.truncation_sigmas,
        );
        Some(AmplificationModel::new(
            table,
            config.amplification.bounds,
            discretizer,
        ))
    } else {
        None
    };

    Ok(PreparedRun {
        sites,
        sources,
        catalog,
        activity,
        tree,
        models,
        amplification,
    })
}

/// Assign model ids in order of first appearance and build each source's branches.
fn resolve_branches(
    definitions: &[SourceDefinition],
    registry: &ModelRegistry,
) -> Result<(Vec<Arc<dyn GroundMotionModel>>, Vec<BranchSet>), RunError> {
    let mut ids: BTreeMap<&str, ModelId> = BTreeMap::new();
    let mut models = Vec::new();
    let mut branch_sets = Vec::with_capacity(definitions.len());
    for def in definitions {
        let mut raw = Vec::with_capacity(def.ground_motion.len());
        for branch in &def.ground_motion {
            let id = match ids.get(branch.model.as_str()) {
                Some(&id) => id,
                None => {
                    let id = ModelId::new(models.len());
                    models.push(registry.resolve(&branch.model)?);
                    ids.insert(branch.model.as_str(), id);
                    id
                }
            };
            raw.push((id, branch.weight));
        }
        let set = BranchSet::new(&raw).map_err(|source| SourceError::Weights {
            source_name: def.name.clone(),
            source,
        })?;
        branch_sets.push(set);
    }
    Ok((models, branch_sets))
}

fn build_pipeline<'a>(
    config: &HazardConfig,
    prepared: &PreparedRun,
    loss: Option<&'a dyn LossEngine>,
) -> Result<SitePipeline<'a>, RunError> {
    let evaluator = MultiModelEvaluator::new(
        prepared.models.clone(),
        prepared.tree.clone(),
        config.periods.clone(),
    )?;
    let gm = &config.ground_motion;
    let mut pipeline = SitePipeline::new(
        evaluator,
        UncertaintyDiscretizer::new(gm.variability, gm.truncation_sigmas),
        gm.spectral,
        LogicTreeCollapser::new(gm.collapse),
        HazardAggregator::new(&config.return_periods),
    )
    .with_products(config.produces_hazard(), config.produces_motion());
    if let Some(model) = &prepared.amplification {
        pipeline = pipeline.with_amplification(model.clone());
    }
    if let Some(engine) = loss {
        pipeline = pipeline.with_loss_engine(engine, config.loss.bridge_period_indices.clone());
    }
    Ok(pipeline)
}

/// Run one rank.
///
/// Returns the merged output on the root and `None` on every other rank.
pub fn run<C: Communicator>(
    config: &HazardConfig,
    comm: &C,
    run_id: Uuid,
    loss: Option<&dyn LossEngine>,
) -> Result<Option<RunOutput>, RunError> {
    let span = info_span!("rank", rank = comm.rank());
    let _guard = span.enter();

    let ctx = RunContext::new(
        run_id,
        config.run.seed,
        &config.run.output_dir,
        comm.rank(),
        comm.size(),
    );
    let prepared = prepare(config, &ModelRegistry::builtin());
    comm.barrier();
    let prepared = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            warn!(error = %err, "Run preparation failed");
            comm.gather(RankReport {
                rank: ctx.rank(),
                outcome: Err(err.to_string()),
            })?;
            ctx.finish();
            return Err(err);
        }
    };

    if ctx.is_root() {
        std::fs::create_dir_all(ctx.output_dir())?;
        info!(
            run_id = %ctx.run_id(),
            name = %config.run.name,
            mode = ?config.run.mode,
            ranks = ctx.size(),
            sites = prepared.sites.len(),
            events = prepared.catalog.len(),
            output_dir = %ctx.output_dir().display(),
            "Run starting"
        );
    }

    let scheduler = SiteBlockScheduler::new(prepared.sites.len(), ctx.size())?;
    let block = scheduler.block(ctx.rank());
    info!(
        block = %ctx.next_name("block"),
        start = block.start,
        len = block.len,
        "Site block assigned"
    );

    let outcome = build_pipeline(config, &prepared, loss).and_then(|pipeline| {
        pipeline.run_block(
            &ctx,
            block,
            scheduler.slice(&prepared.sites, ctx.rank()),
            &prepared.catalog,
            &prepared.activity,
        )
    });
    let failure = outcome.as_ref().err().map(ToString::to_string);
    if let Some(message) = &failure {
        warn!(%message, "Site block failed");
    }

    let gathered = comm.gather(RankReport {
        rank: ctx.rank(),
        outcome: outcome.map_err(|err| err.to_string()),
    })?;
    let rank = ctx.rank();
    ctx.finish();

    match (gathered, failure) {
        (Some(reports), _) => {
            let output = RunOutput::merge(&scheduler, reports)?;
            info!(
                hazard = output.hazard.is_some(),
                motion = output.motion.is_some(),
                loss = output.loss.is_some(),
                "Run complete"
            );
            Ok(Some(output))
        }
        (None, Some(message)) => Err(RunError::RankFailed { rank, message }),
        (None, None) => Ok(None),
    }
}

/// Run every rank of `config.run.ranks` on its own thread.
///
/// A single rank runs on the calling thread with no transport at all.
pub fn run_threaded(
    config: &HazardConfig,
    loss: Option<&dyn LossEngine>,
) -> Result<RunOutput, RunError> {
    let run_id = RunContext::new_run_id();
    let ranks = config.run.ranks.max(1);
    if ranks == 1 {
        return run(config, &SingleRank, run_id, loss)?.ok_or_else(missing_root_output);
    }

    let results: Vec<Result<Option<RunOutput>, RunError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = ChannelCommunicator::group(ranks)
            .into_iter()
            .map(|comm| scope.spawn(move || run(config, &comm, run_id, loss)))
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(rank, handle)| {
                handle
                    .join()
                    .unwrap_or(Err(RunError::RankPanicked { rank }))
            })
            .collect()
    });

    let mut root = None;
    for result in results {
        if let Some(output) = result? {
            root = Some(output);
        }
    }
    root.ok_or_else(missing_root_output)
}

fn missing_root_output() -> RunError {
    RunError::RankFailed {
        rank: 0,
        message: "root produced no output".to_owned(),
    }
}
