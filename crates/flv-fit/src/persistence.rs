//! Stored fit results, manifests and run provenance.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use flv_core::{ErrorInfo, FlvError, RunProvenance, SchemaVersion};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chain::Chain;
use crate::config::ScanConfig;
use crate::diagnostics::Diagnostics;
use crate::fit::FitSpec;
use crate::measurements::Measurement;

/// Layout version of [`FitResult`] files.
pub const RESULT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Everything needed to analyse a finished fit without re-running it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// File layout version.
    pub schema_version: SchemaVersion,
    /// The fit that was run.
    pub fit: FitSpec,
    /// Scan settings.
    pub config: ScanConfig,
    /// Measurements as loaded at run time.
    pub measurements: Vec<Measurement>,
    /// Post-burn-in chain.
    pub chain: Chain,
    /// Inputs, seed and timestamp.
    pub provenance: RunProvenance,
}

impl FitResult {
    /// Diagnostics recomputed from the stored chain.
    pub fn diagnostics(&self) -> Result<Diagnostics, FlvError> {
        Diagnostics::from_chain(&self.chain)
    }

    /// Writes the result as pretty JSON.
    pub fn store(&self, path: &Path) -> Result<(), FlvError> {
        write_json(path, self, "result")
    }

    /// Loads a result, rejecting incompatible layouts.
    pub fn load(path: &Path) -> Result<Self, FlvError> {
        let result: Self = read_json(path, "result")?;
        if result.schema_version.major != RESULT_SCHEMA.major {
            return Err(FlvError::Serde(
                ErrorInfo::new("result-schema", "unsupported result layout")
                    .with_context("path", path.display().to_string())
                    .with_context(
                        "version",
                        format!(
                            "{}.{}.{}",
                            result.schema_version.major,
                            result.schema_version.minor,
                            result.schema_version.patch
                        ),
                    ),
            ));
        }
        Ok(result)
    }
}

/// Index of the artefacts written for a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Fit name.
    pub fit_name: String,
    /// Result file relative to the manifest's directory.
    pub result_file: PathBuf,
    /// Master seed of the run.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Hash of the run inputs.
    pub input_hash: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Retained samples.
    pub n_samples: usize,
}

impl RunManifest {
    /// Manifest describing `result` stored as `result_file`.
    pub fn for_result(result: &FitResult, result_file: PathBuf) -> Self {
        Self {
            fit_name: result.fit.name.clone(),
            result_file,
            master_seed: result.provenance.seed,
            seed_label: result.config.seed_policy.label.clone(),
            input_hash: result.provenance.input_hash.clone(),
            created_at: result.provenance.created_at.clone(),
            n_samples: result.chain.len(),
        }
    }

    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), FlvError> {
        write_json(path, self, "manifest")
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, FlvError> {
        read_json(path, "manifest")
    }
}

#[derive(Serialize)]
struct HashedInputs<'a> {
    fit: &'a FitSpec,
    config: &'a ScanConfig,
    measurements: &'a [Measurement],
}

/// SHA-256 of the canonical JSON of the run inputs.
pub fn input_hash(
    fit: &FitSpec,
    config: &ScanConfig,
    measurements: &[Measurement],
) -> Result<String, FlvError> {
    let bytes = serde_json::to_vec(&HashedInputs {
        fit,
        config,
        measurements,
    })
    .map_err(|err| FlvError::Serde(ErrorInfo::new("input-hash", err.to_string())))?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}

/// Provenance record stamped with the current time.
pub fn provenance(
    fit: &FitSpec,
    config: &ScanConfig,
    measurements: &[Measurement],
) -> Result<RunProvenance, FlvError> {
    let mut tool_versions = BTreeMap::new();
    tool_versions.insert(env!("CARGO_PKG_NAME").to_string(), env!("CARGO_PKG_VERSION").to_string());
    Ok(RunProvenance {
        input_hash: input_hash(fit, config, measurements)?,
        seed: config.seed_policy.master_seed,
        created_at: Utc::now().to_rfc3339(),
        tool_versions,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<(), FlvError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            FlvError::Serde(
                ErrorInfo::new(format!("{what}-mkdir"), err.to_string())
                    .with_context("path", parent.display().to_string()),
            )
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|err| {
        FlvError::Serde(
            ErrorInfo::new(format!("{what}-serialize"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    fs::write(path, json).map_err(|err| {
        FlvError::Serde(
            ErrorInfo::new(format!("{what}-write"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, FlvError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        FlvError::Serde(
            ErrorInfo::new(format!("{what}-read"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    serde_json::from_str(&contents).map_err(|err| {
        FlvError::Serde(
            ErrorInfo::new(format!("{what}-parse"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_hash_tracks_the_seed() {
        let fit = FitSpec::new("f").with_fit_parameters(["Vus"]);
        let config = ScanConfig::default();
        let a = input_hash(&fit, &config, &[]).unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, input_hash(&fit, &config, &[]).unwrap());
        let mut reseeded = config.clone();
        reseeded.seed_policy.master_seed += 1;
        assert_ne!(a, input_hash(&fit, &reseeded, &[]).unwrap());
    }
}
