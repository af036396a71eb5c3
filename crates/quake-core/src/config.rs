//! Configuration loading and typed config structures for a hazard run.
//!
//! The canonical configuration lives in `quake-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, a loader, and [`HazardConfig::validate`], which rejects
//! invalid or contradictory settings before any event is generated.

use std::path::{Path, PathBuf};

use quake_motion::{
    AmplificationBounds, CollapseMode, ModelRegistry, SpectralPostProcessor, VariabilityMethod,
};
use quake_source::{MagnitudeSampling, ScalingConfig, SourceDefinition, SourceKind};
use quake_types::{GeoPoint, Site, SiteId, StructureInventory, normalize_weights};
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// Settings are invalid or contradict each other.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// What a run produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Synthetic catalog aggregated into hazard curves.
    #[default]
    Hazard,
    /// Scenario ruptures reported as ground motion.
    Scenario,
}

/// Top-level run configuration.
///
/// Mirrors the structure of `quake-config.yaml`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardConfig {
    /// Run-level settings (name, seed, mode, ranks).
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Sites to assess.
    #[serde(default)]
    pub sites: Vec<SiteDefinition>,

    /// Optional subset of site indices to process.
    #[serde(default)]
    pub site_selection: Option<Vec<usize>>,

    /// Spectral periods in seconds, ascending; 0 denotes PGA.
    #[serde(default = "default_periods")]
    pub periods: Vec<f64>,

    /// Return periods in years for hazard output.
    #[serde(default = "default_return_periods")]
    pub return_periods: Vec<f64>,

    /// Seismic sources.
    #[serde(default)]
    pub sources: Vec<SourceDefinition>,

    /// Event generation settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Ground-motion uncertainty and post-processing.
    #[serde(default)]
    pub ground_motion: GroundMotionConfig,

    /// Site amplification.
    #[serde(default)]
    pub amplification: AmplificationConfig,

    /// Output selection.
    #[serde(default)]
    pub output: OutputConfig,

    /// Settings handed to the loss engine.
    #[serde(default)]
    pub loss: LossConfig,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            run: RunConfig::default(),
            logging: LoggingConfig::default(),
            sites: Vec::new(),
            site_selection: None,
            periods: default_periods(),
            return_periods: default_return_periods(),
            sources: Vec::new(),
            generation: GenerationConfig::default(),
            ground_motion: GroundMotionConfig::default(),
            amplification: AmplificationConfig::default(),
            output: OutputConfig::default(),
            loss: LossConfig::default(),
        }
    }
}

impl HazardConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Relative amplification table paths are resolved against the file's
    /// directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        if let (Some(table), Some(dir)) = (&config.amplification.table, path.parent()) {
            if table.is_relative() {
                config.amplification.table = Some(dir.join(table));
            }
        }
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Whether hazard curves are produced.
    pub fn produces_hazard(&self) -> bool {
        self.run.mode == RunMode::Hazard && self.output.save_hazard
    }

    /// Whether per-site motion is retained.
    pub fn produces_motion(&self) -> bool {
        self.run.mode == RunMode::Scenario || self.output.save_motion
    }

    /// Index of the PGA (zero) period, if configured.
    pub fn pga_index(&self) -> Option<usize> {
        self.periods.iter().position(|&p| p == 0.0)
    }

    /// The sites to process, in global order.
    pub fn resolve_sites(&self) -> Result<Vec<Site>, ConfigError> {
        let all: Vec<&SiteDefinition> = match &self.site_selection {
            None => self.sites.iter().collect(),
            Some(indices) => indices
                .iter()
                .map(|&i| {
                    self.sites
                        .get(i)
                        .ok_or_else(|| invalid(format!("site_selection index {i} out of range")))
                })
                .collect::<Result<_, _>>()?,
        };
        Ok(all
            .into_iter()
            .enumerate()
            .map(|(i, def)| def.to_site(SiteId::new(i)))
            .collect())
    }

    /// Reject invalid or contradictory settings.
    ///
    /// Runs once, before any event is generated.
    pub fn validate(&self, registry: &ModelRegistry) -> Result<(), ConfigError> {
        if self.run.ranks == 0 {
            return Err(invalid("run.ranks must be at least 1"));
        }
        self.validate_periods()?;
        self.validate_variability()?;
        self.validate_amplification()?;

        if self.run.mode == RunMode::Hazard {
            if self.return_periods.is_empty() {
                return Err(invalid("return_periods must not be empty for hazard runs"));
            }
            if let Some(rp) = self.return_periods.iter().find(|&&rp| !positive(rp)) {
                return Err(invalid(format!("return period {rp} must be positive")));
            }
        }
        if self.generation.magnitude_bins == 0 {
            return Err(invalid("generation.magnitude_bins must be at least 1"));
        }

        for source in &self.sources {
            self.validate_source(source, registry)?;
        }
        if let Some(index) = self
            .loss
            .bridge_period_indices
            .iter()
            .find(|&&i| i >= self.periods.len())
        {
            return Err(invalid(format!(
                "loss.bridge_period_indices entry {index} is out of range"
            )));
        }
        self.resolve_sites().map(|_| ())
    }

    fn validate_periods(&self) -> Result<(), ConfigError> {
        if self.periods.is_empty() {
            return Err(invalid("periods must not be empty"));
        }
        if let Some(p) = self.periods.iter().find(|&&p| !p.is_finite() || p < 0.0) {
            return Err(invalid(format!("period {p} must be non-negative")));
        }
        if self.periods.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("periods must be strictly ascending"));
        }
        let spectral = &self.ground_motion.spectral;
        if spectral.pga_cutoff.is_some() && self.pga_index().is_none() {
            return Err(invalid("pga_cutoff requires period 0 among periods"));
        }
        if let Some(cap) = spectral.pga_cutoff {
            if !positive(cap) {
                return Err(invalid(format!("pga_cutoff {cap} must be positive")));
            }
        }
        if let Some(d) = spectral.distance_threshold_km {
            if !positive(d) {
                return Err(invalid(format!("distance_threshold_km {d} must be positive")));
            }
        }
        Ok(())
    }

    fn validate_variability(&self) -> Result<(), ConfigError> {
        let gm = &self.ground_motion;
        for (label, method) in [
            ("ground_motion.variability", gm.variability),
            ("amplification.variability", self.amplification.variability),
        ] {
            if let VariabilityMethod::Spawn { bins: 0 } = method {
                return Err(invalid(format!("{label}: spawn bins must be at least 1")));
            }
            if method == VariabilityMethod::Random && self.produces_hazard() {
                return Err(invalid(format!(
                    "{label}: random sampling cannot be combined with hazard output"
                )));
            }
        }
        if !positive(gm.truncation_sigmas) {
            return Err(invalid("ground_motion.truncation_sigmas must be positive"));
        }
        Ok(())
    }

    fn validate_amplification(&self) -> Result<(), ConfigError> {
        let amp = &self.amplification;
        if !amp.enabled {
            return Ok(());
        }
        let AmplificationBounds {
            min_factor,
            max_factor,
        } = amp.bounds;
        if !(positive(min_factor) && positive(max_factor)) {
            return Err(invalid("amplification factor bounds must be positive"));
        }
        if min_factor > max_factor {
            return Err(invalid(format!(
                "amplification min_factor {min_factor} exceeds max_factor {max_factor}"
            )));
        }
        if self.pga_index().is_none() {
            return Err(invalid("amplification requires period 0 among periods"));
        }
        Ok(())
    }

    fn validate_source(
        &self,
        source: &SourceDefinition,
        registry: &ModelRegistry,
    ) -> Result<(), ConfigError> {
        let name = &source.name;
        if source.ground_motion.is_empty() {
            return Err(invalid(format!("source `{name}` has no ground-motion models")));
        }
        let weights: Vec<f64> = source.ground_motion.iter().map(|b| b.weight).collect();
        normalize_weights(&weights)
            .map_err(|err| invalid(format!("source `{name}` ground-motion weights: {err}")))?;
        for branch in &source.ground_motion {
            registry
                .check_periods(&branch.model, &self.periods)
                .map_err(|err| invalid(format!("source `{name}`: {err}")))?;
        }

        if matches!(source.kind, SourceKind::Scenario(_)) {
            return Ok(());
        }
        if source.recurrence.is_empty() {
            return Err(invalid(format!("source `{name}` has no recurrence model")));
        }
        for model in &source.recurrence {
            model
                .validate()
                .map_err(|err| invalid(format!("source `{name}`: {err}")))?;
        }
        let weights: Vec<f64> = source.recurrence.iter().map(|m| m.weight).collect();
        normalize_weights(&weights)
            .map_err(|err| invalid(format!("source `{name}` recurrence weights: {err}")))?;
        Ok(())
    }
}

/// Run-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run name, used for output file names.
    #[serde(default = "default_run_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// What the run produces.
    #[serde(default)]
    pub mode: RunMode,

    /// Number of parallel ranks.
    #[serde(default = "default_ranks")]
    pub ranks: usize,

    /// Directory for result files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: default_run_name(),
            seed: default_seed(),
            mode: RunMode::default(),
            ranks: default_ranks(),
            output_dir: default_output_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One site as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDefinition {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Site class label used for amplification.
    #[serde(default)]
    pub site_class: String,
    /// Average shear-wave velocity of the top 30 m.
    #[serde(default)]
    pub vs30: Option<f64>,
    /// Structural inventory handed to the loss engine.
    #[serde(default)]
    pub inventory: Option<StructureInventory>,
}

impl SiteDefinition {
    fn to_site(&self, id: SiteId) -> Site {
        let mut site = Site::new(id, GeoPoint::new(self.latitude, self.longitude), &self.site_class);
        site.vs30 = self.vs30;
        site.inventory.clone_from(&self.inventory);
        site
    }
}

/// Event generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// How synthetic magnitudes are drawn.
    #[serde(default)]
    pub magnitude_sampling: MagnitudeSampling,

    /// Magnitude bins per recurrence model for activity.
    #[serde(default = "default_magnitude_bins")]
    pub magnitude_bins: usize,

    /// Rupture scaling parameters.
    #[serde(default)]
    pub scaling: ScalingConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            magnitude_sampling: MagnitudeSampling::default(),
            magnitude_bins: default_magnitude_bins(),
            scaling: ScalingConfig::default(),
        }
    }
}

/// Ground-motion uncertainty and post-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundMotionConfig {
    /// How log-normal scatter is realised.
    #[serde(default)]
    pub variability: VariabilityMethod,

    /// Truncation of the normal distribution in standard deviations.
    #[serde(default = "default_truncation_sigmas")]
    pub truncation_sigmas: f64,

    /// Treatment of the logic-tree branch axis.
    #[serde(default)]
    pub collapse: CollapseMode,

    /// Distance threshold, PGA cutoff, and smoothing.
    #[serde(default)]
    pub spectral: SpectralPostProcessor,
}

impl Default for GroundMotionConfig {
    fn default() -> Self {
        Self {
            variability: VariabilityMethod::default(),
            truncation_sigmas: default_truncation_sigmas(),
            collapse: CollapseMode::default(),
            spectral: SpectralPostProcessor::default(),
        }
    }
}

/// Site amplification settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmplificationConfig {
    /// Whether amplification is applied.
    #[serde(default)]
    pub enabled: bool,

    /// Path to the JSON amplification table.
    #[serde(default)]
    pub table: Option<PathBuf>,

    /// Allowed range of the soil/bedrock ratio.
    #[serde(flatten)]
    pub bounds: AmplificationBounds,

    /// How amplification scatter is realised.
    #[serde(default)]
    pub variability: VariabilityMethod,
}

/// Output selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Produce hazard curves in hazard mode.
    #[serde(default = "default_true")]
    pub save_hazard: bool,

    /// Keep per-site motion in hazard mode (always kept in scenario mode).
    #[serde(default)]
    pub save_motion: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_hazard: true,
            save_motion: false,
        }
    }
}

/// Settings handed to the loss engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossConfig {
    /// Period indices relevant to bridge damage.
    #[serde(default)]
    pub bridge_period_indices: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_run_name() -> String {
    "quake".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_ranks() -> usize {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_periods() -> Vec<f64> {
    vec![0.0, 0.2, 1.0]
}

fn default_return_periods() -> Vec<f64> {
    vec![475.0, 2475.0]
}

const fn default_magnitude_bins() -> usize {
    quake_source::DEFAULT_MAGNITUDE_BINS
}

const fn default_truncation_sigmas() -> f64 {
    2.5
}

const fn default_true() -> bool {
    true
}
