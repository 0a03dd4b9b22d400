//! Built-in parameter table and parameter loaders.

use std::fs;
use std::path::{Path, PathBuf};

use flv_core::{ErrorInfo, FlvError, ParameterSchema, ParameterSpec, Support};
use serde::{Deserialize, Serialize};

use crate::channels::FormFactorFamily;
use crate::formfactors::{coefficient_name, FormFactorComponent};

/// Supplies the parameter schema a catalogue is evaluated with.
pub trait ParameterSource {
    /// Loads the parameter schema, defaults and uncertainties included.
    fn load_defaults(&self) -> Result<ParameterSchema, FlvError>;
}

/// The table compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinParameters;

impl ParameterSource for BuiltinParameters {
    fn load_defaults(&self) -> Result<ParameterSchema, FlvError> {
        default_parameters()
    }
}

/// On-disk YAML layout: a list of parameter entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterFile {
    /// Declared parameters.
    pub parameters: Vec<ParameterSpec>,
}

/// Parameters read from a YAML file, optionally layered over the built-in table.
#[derive(Debug, Clone)]
pub struct YamlParameters {
    path: PathBuf,
    over_builtin: bool,
}

impl YamlParameters {
    /// Source that declares every parameter itself.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            over_builtin: false,
        }
    }

    /// Source whose entries replace or extend the built-in table.
    pub fn over_builtin(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            over_builtin: true,
        }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ParameterSource for YamlParameters {
    fn load_defaults(&self) -> Result<ParameterSchema, FlvError> {
        let text = fs::read_to_string(&self.path).map_err(|err| {
            FlvError::Serde(
                ErrorInfo::new("parameter-file-read", err.to_string())
                    .with_context("path", self.path.display().to_string()),
            )
        })?;
        let file = parse_parameter_file(&text).map_err(|err| match err {
            FlvError::Serde(info) => {
                FlvError::Serde(info.with_context("path", self.path.display().to_string()))
            }
            other => other,
        })?;
        if self.over_builtin {
            let mut schema = default_parameters()?;
            for spec in file.parameters {
                schema.upsert(spec);
            }
            Ok(schema)
        } else {
            let mut schema = ParameterSchema::new();
            for spec in file.parameters {
                schema.insert(spec)?;
            }
            Ok(schema)
        }
    }
}

/// Parses a [`ParameterFile`] from YAML text.
pub fn parse_parameter_file(text: &str) -> Result<ParameterFile, FlvError> {
    serde_yaml::from_str(text)
        .map_err(|err| FlvError::Serde(ErrorInfo::new("parameter-file-parse", err.to_string())))
}

fn positive(name: &str, value: f64, sigma: f64) -> ParameterSpec {
    let spec = ParameterSpec::real(name, value).with_support(Support::Positive);
    if sigma > 0.0 {
        spec.with_sigma(sigma)
    } else {
        spec
    }
}

fn unit_interval(name: &str, value: f64, sigma: f64) -> ParameterSpec {
    ParameterSpec::real(name, value)
        .with_support(Support::Interval {
            low: 0.0,
            high: 1.0,
        })
        .with_sigma(sigma)
}

/// Central values and uncertainties of every parameter used by the standard catalogue.
pub fn default_parameters() -> Result<ParameterSchema, FlvError> {
    let mut schema = ParameterSchema::new();
    let positives: &[(&str, f64, f64)] = &[
        ("Gmu", 1.1663787e-5, 6e-12),
        ("alpha_e", 1.0 / 127.940, 0.0),
        ("alpha_s", 0.1181, 0.0011),
        ("s2w", 0.23129, 0.00005),
        ("m_Z", 91.1876, 0.0021),
        ("m_W", 80.379, 0.012),
        ("m_b", 4.18, 0.03),
        ("m_c", 1.275, 0.025),
        ("m_t", 163.53, 0.83),
        ("m_e", 0.000510999, 0.0),
        ("m_mu", 0.1056584, 0.0),
        ("m_tau", 1.77686, 0.00012),
        ("m_B0", 5.27963, 0.0),
        ("m_B+", 5.27932, 0.0),
        ("m_Bs", 5.36689, 0.0),
        ("m_K*0", 0.89555, 0.0),
        ("m_K*+", 0.89166, 0.0),
        ("m_phi", 1.019461, 0.0),
        ("m_K0", 0.497611, 0.0),
        ("tau_B0", 1.519, 0.004),
        ("tau_B+", 1.638, 0.004),
        ("tau_Bs", 1.510, 0.005),
        ("tau_KL", 5.116e4, 21.0),
        ("tau_K+", 1.238e4, 2.0),
        ("f_B0", 0.190, 0.0013),
        ("f_B+", 0.190, 0.0013),
        ("f_Bs", 0.2303, 0.0013),
        ("f_K0", 0.1556, 0.0004),
        ("f_K*0", 0.204, 0.007),
        ("f_K*+", 0.204, 0.007),
        ("f_phi", 0.233, 0.004),
        ("lambda_B", 0.46, 0.11),
        ("bag_B0_1", 1.30, 0.10),
        ("bag_Bs_1", 1.35, 0.08),
        ("bag_K0_1", 0.7625, 0.0097),
        ("eta_tt_B", 0.55217, 0.0),
        ("eta_tt_K0", 0.5765, 0.0065),
        ("eta_cc_K0", 1.87, 0.76),
        ("eta_ct_K0", 0.496, 0.047),
        ("kappa_epsilon", 0.94, 0.02),
        ("DeltaM_K0", 0.005293, 0.000009),
        ("BR(K+->pienu)", 0.0507, 0.0004),
    ];
    for &(name, value, sigma) in positives {
        schema.insert(positive(name, value, sigma))?;
    }

    schema.insert(
        unit_interval("Vus", 0.2248, 0.0006).describe("|V_us| from semileptonic kaon decays"),
    )?;
    schema.insert(
        unit_interval("Vub", 0.00382, 0.00024).describe("|V_ub| from tree-level decays"),
    )?;
    schema.insert(unit_interval("Vcb", 0.0406, 0.0013).describe("|V_cb| from tree-level decays"))?;
    schema.insert(
        ParameterSpec::real("gamma", 1.27)
            .with_sigma(0.08)
            .cp_odd()
            .describe("CKM angle gamma in radians"),
    )?;
    schema.insert(ParameterSpec::real("deltaPcu", 0.04).with_sigma(0.02))?;

    let form_factors: [(FormFactorFamily, [(FormFactorComponent, f64, f64); 7]); 2] = [
        (
            FormFactorFamily::BToKStar,
            [
                (FormFactorComponent::A0, 0.39, -1.15),
                (FormFactorComponent::A1, 0.29, 0.31),
                (FormFactorComponent::A12, 0.27, 0.53),
                (FormFactorComponent::V, 0.38, -1.17),
                (FormFactorComponent::T1, 0.31, -1.01),
                (FormFactorComponent::T2, 0.31, 0.50),
                (FormFactorComponent::T23, 0.67, 1.32),
            ],
        ),
        (
            FormFactorFamily::BsToPhi,
            [
                (FormFactorComponent::A0, 0.39, -1.00),
                (FormFactorComponent::A1, 0.30, 0.42),
                (FormFactorComponent::A12, 0.26, 0.60),
                (FormFactorComponent::V, 0.39, -1.00),
                (FormFactorComponent::T1, 0.31, -0.90),
                (FormFactorComponent::T2, 0.31, 0.60),
                (FormFactorComponent::T23, 0.62, 1.40),
            ],
        ),
    ];
    for (family, components) in form_factors {
        for (component, a0, a1) in components {
            let leading = coefficient_name(family, component, 0);
            let slope = coefficient_name(family, component, 1);
            schema.insert(ParameterSpec::real(leading, a0).with_sigma(0.1 * a0.abs()))?;
            schema.insert(ParameterSpec::real(slope, a1).with_sigma(0.3))?;
        }
    }
    Ok(schema)
}
