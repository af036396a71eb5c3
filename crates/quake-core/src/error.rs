//! Error types for a hazard run.
//!
//! [`RunError`] wraps every subsystem failure a run can hit, so the
//! orchestration code can propagate with `?`. No failure is recovered:
//! a rank either completes its block or the run fails without emitting
//! partial results.

use quake_motion::MotionError;
use quake_source::SourceError;
use quake_types::{ActivityError, ShapeError};

use crate::comm::CommError;
use crate::config::ConfigError;
use crate::loss::LossError;

/// Errors that can occur during a hazard run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Configuration was invalid or contradictory.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Source construction or event generation failed.
    #[error("source error: {source}")]
    Source {
        /// The underlying source error.
        #[from]
        source: SourceError,
    },

    /// Ground-motion evaluation or post-processing failed.
    #[error("motion error: {source}")]
    Motion {
        /// The underlying motion error.
        #[from]
        source: MotionError,
    },

    /// Array shapes did not line up.
    #[error("shape error: {source}")]
    Shape {
        /// The underlying shape error.
        #[from]
        source: ShapeError,
    },

    /// Activity values violated their invariants.
    #[error("activity error: {source}")]
    Activity {
        /// The underlying activity error.
        #[from]
        source: ActivityError,
    },

    /// The loss engine failed.
    #[error("loss error: {source}")]
    Loss {
        /// The underlying loss error.
        #[from]
        source: LossError,
    },

    /// Inter-rank messaging failed.
    #[error("transport error: {source}")]
    Transport {
        /// The underlying transport error.
        #[from]
        source: CommError,
    },

    /// The output directory could not be prepared.
    #[error("failed to prepare output directory: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A rank reported failure instead of a result.
    #[error("rank {rank} failed: {message}")]
    RankFailed {
        /// The failing rank.
        rank: usize,
        /// The rank's error message.
        message: String,
    },

    /// A rank thread panicked.
    #[error("rank {rank} panicked")]
    RankPanicked {
        /// The rank whose thread panicked.
        rank: usize,
    },
}
