use std::fs;
use std::path::{Path, PathBuf};

use flv_core::{config_error, ErrorInfo, FlvError};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing an ensemble scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Total number of ensemble steps, burn-in included.
    pub steps: usize,
    /// Number of initial steps excluded from the stored chain.
    #[serde(default)]
    pub burnin: usize,
    /// Ensemble size; defaults to twice the number of fitted dimensions.
    #[serde(default)]
    pub walkers: Option<usize>,
    /// Stretch move scale `a`; proposals use `z` in `[1/a, a]`.
    #[serde(default = "default_stretch_scale")]
    pub stretch_scale: f64,
    /// Initial walker spread in units of each parameter's width.
    #[serde(default = "default_init_spread")]
    pub init_spread: f64,
    /// Worker threads for walker evaluation; `None` uses the global pool.
    #[serde(default)]
    pub threads: Option<usize>,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Output layout.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_stretch_scale() -> f64 {
    2.0
}

fn default_init_spread() -> f64 {
    1e-2
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            steps: 600,
            burnin: 10,
            walkers: None,
            stretch_scale: default_stretch_scale(),
            init_spread: default_init_spread(),
            threads: None,
            seed_policy: SeedPolicy::default(),
            output: OutputConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, FlvError> {
        serde_yaml::from_str(text)
            .map_err(|err| FlvError::Serde(ErrorInfo::new("scan-config-parse", err.to_string())))
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, FlvError> {
        let text = fs::read_to_string(path).map_err(|err| {
            FlvError::Serde(
                ErrorInfo::new("scan-config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Rejects settings the sampler cannot run with.
    pub fn validate(&self) -> Result<(), FlvError> {
        if self.burnin >= self.steps {
            return Err(config_error(
                "scan-burnin",
                format!("burnin ({}) must be smaller than steps ({})", self.burnin, self.steps),
            ));
        }
        if !(self.stretch_scale > 1.0) {
            return Err(config_error(
                "scan-stretch-scale",
                format!("stretch scale must exceed 1, got {}", self.stretch_scale),
            ));
        }
        if !(self.init_spread > 0.0 && self.init_spread.is_finite()) {
            return Err(config_error(
                "scan-init-spread",
                format!("initial spread must be positive, got {}", self.init_spread),
            ));
        }
        if self.threads == Some(0) {
            return Err(config_error("scan-threads", "thread count must be positive"));
        }
        Ok(())
    }

    /// Ensemble size for `dimensions` fitted coordinates.
    pub fn walker_count(&self, dimensions: usize) -> Result<usize, FlvError> {
        let walkers = self.walkers.unwrap_or(2 * dimensions);
        if walkers < 2 || walkers % 2 != 0 || walkers < dimensions {
            return Err(config_error(
                "scan-walkers",
                format!(
                    "need an even number of at least max(2, {dimensions}) walkers, got {walkers}"
                ),
            ));
        }
        Ok(walkers)
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the scan.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Output layout of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the result is written to when the scan completes; `None` keeps it in memory.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Result filename; defaults to a slug of the fit name.
    #[serde(default)]
    pub result_file: Option<PathBuf>,
    /// Manifest filename relative to the output directory.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            result_file: None,
            manifest_file: default_manifest_filename(),
        }
    }
}
