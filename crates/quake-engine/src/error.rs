//! Error types for the hazard engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup, the run, and result persistence.

/// Top-level error for the hazard engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: quake_core::ConfigError,
    },

    /// The hazard run failed.
    #[error("run error: {source}")]
    Run {
        /// The underlying run error.
        #[from]
        source: quake_core::RunError,
    },

    /// Writing results failed.
    #[error("failed to write results: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Serialising results failed.
    #[error("failed to serialise results: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
