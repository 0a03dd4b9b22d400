use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, FlvError};

/// YAML-configurable settings shared by all prediction functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PhysicsConfig {
    /// Renormalisation scale per sector.
    #[serde(default, rename = "renormalization scale")]
    pub renormalization_scale: RenormalizationScales,
}

/// Renormalisation scales in GeV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenormalizationScales {
    /// Exclusive B -> V l+ l- decays.
    #[serde(default = "default_bvll_scale")]
    pub bvll: f64,
    /// Rare kaon decays.
    #[serde(default = "default_kdecays_scale")]
    pub kdecays: f64,
    /// Neutral meson mixing.
    #[serde(default = "default_mixing_scale")]
    pub mixing: f64,
}

fn default_bvll_scale() -> f64 {
    4.8
}

fn default_kdecays_scale() -> f64 {
    4.8
}

fn default_mixing_scale() -> f64 {
    4.2
}

impl Default for RenormalizationScales {
    fn default() -> Self {
        Self {
            bvll: default_bvll_scale(),
            kdecays: default_kdecays_scale(),
            mixing: default_mixing_scale(),
        }
    }
}

impl PhysicsConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, FlvError> {
        serde_yaml::from_str(text).map_err(|err| {
            FlvError::Serde(ErrorInfo::new("physics-config-parse", err.to_string()))
        })
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, FlvError> {
        let text = fs::read_to_string(path).map_err(|err| {
            FlvError::Serde(
                ErrorInfo::new("physics-config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = PhysicsConfig::from_yaml_str("renormalization scale:\n  bvll: 5.0\n").unwrap();
        assert_eq!(config.renormalization_scale.bvll, 5.0);
        assert_eq!(config.renormalization_scale.kdecays, 4.8);
    }
}
