//! Configuration, per-site pipeline, and parallel orchestration for the Quake
//! hazard pipeline.
//!
//! A run flows: config → sources and catalog → site blocks per rank → per
//! site evaluation, spawning, amplification, collapse → hazard curves,
//! retained motion, and loss → gather and stitch on the root.
//!
//! # Modules
//!
//! - [`comm`] -- [`Communicator`] trait with single-rank and channel transports.
//! - [`config`] -- Configuration loading from `quake-config.yaml` into
//!   strongly-typed structs, plus validation.
//! - [`context`] -- [`RunContext`]: run identity, seed, and name counter.
//! - [`error`] -- [`RunError`], wrapping every subsystem error.
//! - [`hazard`] -- [`HazardAggregator`]: exceedance-rate interpolation.
//! - [`loss`] -- [`LossEngine`] seam to an external damage model.
//! - [`output`] -- Partial and merged run outputs.
//! - [`pipeline`] -- [`SitePipeline`]: every stage for one site.
//! - [`runner`] -- [`run`] and [`run_threaded`].
//! - [`scheduler`] -- [`SiteBlockScheduler`]: contiguous site blocks per rank.
//!
//! [`Communicator`]: comm::Communicator
//! [`RunContext`]: context::RunContext
//! [`RunError`]: error::RunError
//! [`HazardAggregator`]: hazard::HazardAggregator
//! [`LossEngine`]: loss::LossEngine
//! [`SitePipeline`]: pipeline::SitePipeline
//! [`run`]: runner::run
//! [`run_threaded`]: runner::run_threaded
//! [`SiteBlockScheduler`]: scheduler::SiteBlockScheduler

pub mod comm;
pub mod config;
pub mod context;
pub mod error;
pub mod hazard;
pub mod loss;
pub mod output;
pub mod pipeline;
pub mod runner;
pub mod scheduler;

pub use comm::{ChannelCommunicator, Communicator, RankReport, SingleRank};
pub use config::{ConfigError, HazardConfig, RunMode};
pub use context::RunContext;
pub use error::RunError;
pub use hazard::HazardAggregator;
pub use loss::{LossEngine, LossError};
pub use output::{PartialOutput, RunOutput};
pub use pipeline::SitePipeline;
pub use runner::{PreparedRun, prepare, run, run_threaded};
pub use scheduler::{SiteBlock, SiteBlockScheduler};
