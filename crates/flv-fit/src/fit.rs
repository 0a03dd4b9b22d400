//! Declarative description of a fit: what is varied and what constrains it.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use flv_core::{config_error, ErrorInfo, FlvError, ParameterSchema};
use serde::{Deserialize, Serialize};

/// Real or imaginary part of a complex Wilson coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComplexPart {
    /// `Re(...)`.
    Re,
    /// `Im(...)`.
    Im,
}

/// One real coordinate of a fitted Wilson coefficient, written `Re(C9_bsmumu)` or `Im(...)`.
///
/// A bare name refers to the real part.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoefficientComponent {
    /// Coefficient name.
    pub name: String,
    /// Selected part.
    pub part: ComplexPart,
}

impl CoefficientComponent {
    /// Real part of `name`.
    pub fn real(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part: ComplexPart::Re,
        }
    }

    /// Imaginary part of `name`.
    pub fn imaginary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part: ComplexPart::Im,
        }
    }

    /// Parses `Re(x)`, `Im(x)` or a bare name.
    pub fn parse(text: &str) -> Result<Self, FlvError> {
        let text = text.trim();
        let (part, inner) = if let Some(rest) = text.strip_prefix("Re(") {
            (ComplexPart::Re, rest.strip_suffix(')'))
        } else if let Some(rest) = text.strip_prefix("Im(") {
            (ComplexPart::Im, rest.strip_suffix(')'))
        } else {
            (ComplexPart::Re, Some(text))
        };
        match inner.map(str::trim) {
            Some(name) if !name.is_empty() && !name.contains(['(', ')']) => Ok(Self {
                name: name.to_string(),
                part,
            }),
            _ => Err(FlvError::Configuration(
                ErrorInfo::new("coefficient-component", "malformed coefficient component")
                    .with_context("text", text)
                    .with_hint("use Re(name), Im(name) or a bare name"),
            )),
        }
    }
}

impl fmt::Display for CoefficientComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.part {
            ComplexPart::Re => write!(f, "Re({})", self.name),
            ComplexPart::Im => write!(f, "Im({})", self.name),
        }
    }
}

impl TryFrom<String> for CoefficientComponent {
    type Error = FlvError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CoefficientComponent> for String {
    fn from(value: CoefficientComponent) -> Self {
        value.to_string()
    }
}

/// Role of one coordinate of the sampled vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinate {
    /// Parameter with a flat prior over its support.
    FitParameter(String),
    /// Parameter with its declared uncertainty as prior.
    Nuisance(String),
    /// Wilson coefficient component with a flat prior.
    Coefficient(CoefficientComponent),
}

impl Coordinate {
    /// Label used for chain columns.
    pub fn label(&self) -> String {
        match self {
            Coordinate::FitParameter(name) | Coordinate::Nuisance(name) => name.clone(),
            Coordinate::Coefficient(component) => component.to_string(),
        }
    }
}

/// A named Bayesian fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSpec {
    /// Fit name; results are stored under it.
    pub name: String,
    /// Parameters varied with flat priors.
    #[serde(default)]
    pub fit_parameters: Vec<String>,
    /// Parameters varied with their uncertainties as priors.
    #[serde(default)]
    pub nuisance_parameters: Vec<String>,
    /// Wilson coefficient components varied with flat priors.
    #[serde(default)]
    pub fit_coefficients: Vec<CoefficientComponent>,
    /// Identifiers of the measurements entering the likelihood.
    pub measurements: Vec<String>,
    /// Observables removed from every constraint.
    #[serde(default)]
    pub exclude_observables: Vec<String>,
}

impl FitSpec {
    /// Fit with no free coordinates yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fit_parameters: Vec::new(),
            nuisance_parameters: Vec::new(),
            fit_coefficients: Vec::new(),
            measurements: Vec::new(),
            exclude_observables: Vec::new(),
        }
    }

    /// Adds fit parameters.
    pub fn with_fit_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fit_parameters.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds nuisance parameters.
    pub fn with_nuisance_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nuisance_parameters.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds a fitted coefficient component.
    pub fn with_coefficient(mut self, component: CoefficientComponent) -> Self {
        self.fit_coefficients.push(component);
        self
    }

    /// Adds measurements.
    pub fn with_measurements<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.measurements.extend(names.into_iter().map(Into::into));
        self
    }

    /// Excludes an observable from all constraints.
    pub fn excluding(mut self, observable: impl Into<String>) -> Self {
        self.exclude_observables.push(observable.into());
        self
    }

    /// Parses a fit from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, FlvError> {
        serde_yaml::from_str(text)
            .map_err(|err| FlvError::Serde(ErrorInfo::new("fit-parse", err.to_string())))
    }

    /// Loads a fit from a YAML file.
    pub fn load(path: &Path) -> Result<Self, FlvError> {
        let text = fs::read_to_string(path).map_err(|err| {
            FlvError::Serde(
                ErrorInfo::new("fit-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Sampled coordinates: fit parameters, then nuisance parameters, then coefficients.
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.fit_parameters
            .iter()
            .cloned()
            .map(Coordinate::FitParameter)
            .chain(self.nuisance_parameters.iter().cloned().map(Coordinate::Nuisance))
            .chain(self.fit_coefficients.iter().cloned().map(Coordinate::Coefficient))
            .collect()
    }

    /// Number of sampled coordinates.
    pub fn dimension(&self) -> usize {
        self.fit_parameters.len() + self.nuisance_parameters.len() + self.fit_coefficients.len()
    }

    /// Filesystem-safe name for the stored result.
    pub fn result_file_name(&self) -> String {
        let slug: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{slug}.json")
    }

    /// Checks names against the parameter schema.
    pub fn check_parameters(&self, schema: &ParameterSchema) -> Result<(), FlvError> {
        if self.name.trim().is_empty() {
            return Err(config_error("fit-name", "fit name must not be empty"));
        }
        if self.dimension() == 0 {
            return Err(FlvError::Configuration(
                ErrorInfo::new("fit-empty", "fit varies nothing")
                    .with_context("fit", self.name.clone()),
            ));
        }
        let mut seen = BTreeSet::new();
        for name in self.fit_parameters.iter().chain(&self.nuisance_parameters) {
            if !seen.insert(name.as_str()) {
                return Err(self.duplicate(name));
            }
            if !schema.contains(name) {
                return Err(FlvError::Configuration(
                    ErrorInfo::new("fit-parameter-unknown", "parameter is not declared")
                        .with_context("fit", self.name.clone())
                        .with_context("parameter", name.clone()),
                ));
            }
        }
        for name in &self.nuisance_parameters {
            let spec = schema.require(name)?;
            if spec.uncertainty.is_none() {
                return Err(FlvError::Configuration(
                    ErrorInfo::new(
                        "nuisance-without-uncertainty",
                        "nuisance parameter has no declared uncertainty",
                    )
                    .with_context("parameter", name.clone())
                    .with_hint("move it to fit_parameters or declare an uncertainty"),
                ));
            }
        }
        let mut components = BTreeSet::new();
        for component in &self.fit_coefficients {
            if !components.insert(component) {
                return Err(self.duplicate(&component.to_string()));
            }
        }
        let mut measurements = BTreeSet::new();
        for name in &self.measurements {
            if !measurements.insert(name.as_str()) {
                return Err(self.duplicate(name));
            }
        }
        Ok(())
    }

    fn duplicate(&self, name: &str) -> FlvError {
        FlvError::Configuration(
            ErrorInfo::new("fit-duplicate", "name listed more than once")
                .with_context("fit", self.name.clone())
                .with_context("name", name),
        )
    }
}
