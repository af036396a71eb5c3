//! Error types for the `quake-motion` crate.
//!
//! All fallible operations in this crate return [`MotionError`].

use quake_types::{EventId, ShapeError};

/// Errors that can occur while evaluating or post-processing ground motion.
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    /// An event magnitude is zero or negative (or not finite).
    #[error("degenerate magnitude {magnitude} for event {event}")]
    DegenerateMagnitude {
        /// The offending event.
        event: EventId,
        /// Its magnitude.
        magnitude: f64,
    },

    /// A model produced a non-finite value.
    #[error("model `{model}` produced non-finite {quantity} for event {event} at site {site}, period index {period}")]
    NumericAnomaly {
        /// Name of the model that produced the value.
        model: String,
        /// The event being evaluated.
        event: EventId,
        /// Site index within the evaluated slice.
        site: usize,
        /// Period index.
        period: usize,
        /// Which output was non-finite (`log_mean` or `log_sigma`).
        quantity: &'static str,
    },

    /// A ground-motion model name is not registered.
    #[error("unknown ground-motion model `{name}`")]
    UnknownModel {
        /// The requested name.
        name: String,
    },

    /// A model has no coefficients for a requested period.
    #[error("model `{model}` does not cover period {period} s")]
    UnsupportedPeriod {
        /// Model name.
        model: String,
        /// Requested period in seconds.
        period: f64,
    },

    /// A logic-tree branch refers to a model that was not supplied.
    #[error("branch {branch} of source {source_index} refers to unknown model index {model}")]
    MissingModel {
        /// Source index.
        source_index: usize,
        /// Branch slot.
        branch: usize,
        /// Model index.
        model: usize,
    },

    /// The amplification table is internally inconsistent.
    #[error("invalid amplification table: {reason}")]
    InvalidTable {
        /// Explanation of what is wrong.
        reason: String,
    },

    /// Required input data was not supplied.
    #[error("required data unavailable: {what}")]
    DataUnavailable {
        /// Description of the missing input.
        what: String,
    },

    /// Array shapes did not line up.
    #[error("shape error: {source}")]
    Shape {
        /// The underlying shape error.
        #[from]
        source: ShapeError,
    },
}
