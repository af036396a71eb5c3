//! Error types for the `quake-source` crate.
//!
//! All fallible operations in this crate return [`SourceError`].

use quake_types::{ActivityError, WeightError};

/// Errors that can occur while building sources, catalogs, and activity.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Recurrence-model or branch weights are invalid.
    #[error("invalid weights for source `{source_name}`: {source}")]
    Weights {
        /// Name of the source whose weights failed.
        source_name: String,
        /// The underlying weight error.
        source: WeightError,
    },

    /// A recurrence model's parameters are inconsistent.
    #[error("invalid recurrence model: {reason}")]
    InvalidRecurrence {
        /// Explanation of what is wrong.
        reason: String,
    },

    /// A source's geometry cannot be used for generation.
    #[error("invalid geometry for source `{source_name}`: {reason}")]
    InvalidGeometry {
        /// Name of the offending source.
        source_name: String,
        /// Explanation of what is wrong.
        reason: String,
    },

    /// Required source data was not supplied.
    #[error("required data unavailable: {what}")]
    DataUnavailable {
        /// Description of the missing input.
        what: String,
    },

    /// The event assignment of a source was computed a second time.
    #[error("events for source `{source_name}` were already assigned")]
    AlreadyAssigned {
        /// Name of the source.
        source_name: String,
    },

    /// The event assignment of a source was read before it was computed.
    #[error("events for source `{source_name}` have not been assigned")]
    NotAssigned {
        /// Name of the source.
        source_name: String,
    },

    /// Activity values violated their invariants.
    #[error("activity error: {source}")]
    Activity {
        /// The underlying activity error.
        #[from]
        source: ActivityError,
    },
}
