//! Hazard engine binary for the Quake pipeline.
//!
//! Loads configuration, runs every rank, and writes the merged results.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the path given as the first argument, or
//!    `quake-config.yaml` in the working directory
//! 2. Initialize structured logging (tracing), honouring `RUST_LOG` first and
//!    `logging.level` second
//! 3. Run `run.ranks` ranks and gather their results on the root
//! 4. Write `<output_dir>/<run_name>_output.json`

mod error;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use quake_core::{HazardConfig, RunOutput};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

const DEFAULT_CONFIG: &str = "quake-config.yaml";

/// Application entry point for the hazard engine.
///
/// # Errors
///
/// Returns an error if configuration, the run, or writing results fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let (config, loaded) = load_config(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("quake-engine starting");
    if loaded {
        info!(path = %path.display(), "Configuration loaded");
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
    }
    info!(
        name = %config.run.name,
        seed = config.run.seed,
        mode = ?config.run.mode,
        ranks = config.run.ranks,
        sites = config.sites.len(),
        sources = config.sources.len(),
        "Run configured"
    );

    let output = quake_core::run_threaded(&config, None).map_err(EngineError::from)?;
    let written = write_output(&config, &output)?;
    info!(path = %written.display(), "Results written");
    Ok(())
}

/// Load configuration, falling back to defaults when the file is missing.
fn load_config(path: &Path) -> Result<(HazardConfig, bool), EngineError> {
    if path.exists() {
        Ok((HazardConfig::from_file(path)?, true))
    } else {
        Ok((HazardConfig::default(), false))
    }
}

fn output_path(config: &HazardConfig) -> PathBuf {
    config
        .run
        .output_dir
        .join(format!("{}_output.json", config.run.name))
}

/// Serialise the merged output as JSON.
fn write_output(config: &HazardConfig, output: &RunOutput) -> Result<PathBuf, EngineError> {
    std::fs::create_dir_all(&config.run.output_dir)?;
    let path = output_path(config);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(writer, output)?;
    Ok(path)
}
