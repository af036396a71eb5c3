//! Ground-motion evaluation and uncertainty handling for the Quake hazard pipeline.
//!
//! Everything in this crate works on the five-axis
//! `[spawn, branch, site, event, period]` layout of
//! [`MotionTensor`](quake_types::MotionTensor).
//!
//! # Modules
//!
//! - [`amplification`] -- Bedrock-to-soil transfer with clamped ratios.
//! - [`collapse`] -- Weighted reduction across the logic-tree branch axis.
//! - [`discretizer`] -- Turns log-normal uncertainty into weighted spawns.
//! - [`distance`] -- Site-to-rupture distance metrics.
//! - [`error`] -- Error types for motion operations.
//! - [`evaluator`] -- [`MultiModelEvaluator`]: every branch model, every cell.
//! - [`models`] -- Ground-motion prediction equations and their registry.
//! - [`spectral`] -- Distance threshold, PGA cutoff, and period smoothing.
//!
//! [`MultiModelEvaluator`]: evaluator::MultiModelEvaluator

pub mod amplification;
pub mod collapse;
pub mod discretizer;
pub mod distance;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod spectral;

// Re-export primary types at crate root.
pub use amplification::{AmplificationBounds, AmplificationModel, AmplificationTable};
pub use collapse::{CollapseMode, LogicTreeCollapser};
pub use discretizer::{Discretized, UncertaintyDiscretizer, VariabilityMethod};
pub use distance::DistanceMetric;
pub use error::MotionError;
pub use evaluator::{LogMotion, MultiModelEvaluator};
pub use models::{GroundMotionModel, ModelRegistry};
pub use spectral::SpectralPostProcessor;
