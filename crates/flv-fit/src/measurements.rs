//! Experimental measurements and the likelihood constraints they imply.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use flv_core::{config_error, normal_log_pdf, Distribution, ErrorInfo, FlvError};
use flv_physics::ObservableInstance;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Probability model of one or more observables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Constraint {
    /// Gaussian constraint on a single observable.
    Normal {
        /// Constrained observable.
        observable: ObservableInstance,
        /// Measured value.
        central: f64,
        /// Standard deviation.
        sigma: f64,
    },
    /// Split Gaussian constraint on a single observable.
    AsymmetricNormal {
        /// Constrained observable.
        observable: ObservableInstance,
        /// Measured value.
        central: f64,
        /// Upper error.
        sigma_plus: f64,
        /// Lower error.
        sigma_minus: f64,
    },
    /// Correlated Gaussian constraint on several observables.
    MultivariateNormal {
        /// Constrained observables, in covariance order.
        observables: Vec<ObservableInstance>,
        /// Measured values.
        central: Vec<f64>,
        /// Row-major covariance matrix.
        covariance: Vec<Vec<f64>>,
    },
}

impl Constraint {
    /// Multivariate constraint from per-observable errors and a correlation matrix.
    pub fn from_correlation(
        observables: Vec<ObservableInstance>,
        central: Vec<f64>,
        sigmas: &[f64],
        correlation: &[Vec<f64>],
    ) -> Result<Self, FlvError> {
        let n = observables.len();
        if sigmas.len() != n
            || correlation.len() != n
            || correlation.iter().any(|row| row.len() != n)
        {
            return Err(config_error(
                "constraint-shape",
                format!("correlation and errors must match {n} observables"),
            ));
        }
        let covariance = (0..n)
            .map(|i| (0..n).map(|j| correlation[i][j] * sigmas[i] * sigmas[j]).collect())
            .collect();
        Ok(Constraint::MultivariateNormal {
            observables,
            central,
            covariance,
        })
    }

    /// Observables the constraint depends on.
    pub fn observables(&self) -> Vec<&ObservableInstance> {
        match self {
            Constraint::Normal { observable, .. }
            | Constraint::AsymmetricNormal { observable, .. } => vec![observable],
            Constraint::MultivariateNormal { observables, .. } => observables.iter().collect(),
        }
    }

    /// Drops observables named in `excluded`, marginalising the remaining Gaussian.
    ///
    /// Returns `None` when nothing is left to constrain.
    pub fn marginalise(&self, excluded: &BTreeSet<String>) -> Option<Constraint> {
        match self {
            Constraint::Normal { observable, .. }
            | Constraint::AsymmetricNormal { observable, .. } => {
                if excluded.contains(&observable.name) {
                    None
                } else {
                    Some(self.clone())
                }
            }
            Constraint::MultivariateNormal {
                observables,
                central,
                covariance,
            } => {
                let keep: Vec<usize> = observables
                    .iter()
                    .enumerate()
                    .filter(|(_, obs)| !excluded.contains(&obs.name))
                    .map(|(idx, _)| idx)
                    .collect();
                match keep.len() {
                    0 => None,
                    n if n == observables.len() => Some(self.clone()),
                    1 => {
                        let idx = keep[0];
                        Some(Constraint::Normal {
                            observable: observables[idx].clone(),
                            central: central[idx],
                            sigma: covariance[idx][idx].sqrt(),
                        })
                    }
                    _ => Some(Constraint::MultivariateNormal {
                        observables: keep.iter().map(|&i| observables[i].clone()).collect(),
                        central: keep.iter().map(|&i| central[i]).collect(),
                        covariance: keep
                            .iter()
                            .map(|&i| keep.iter().map(|&j| covariance[i][j]).collect())
                            .collect(),
                    }),
                }
            }
        }
    }

    /// Validates the constraint and factorises its covariance.
    pub fn prepare(&self) -> Result<PreparedConstraint, FlvError> {
        match self {
            Constraint::Normal {
                observable,
                central,
                sigma,
            } => {
                Distribution::normal(*central, *sigma).validate()?;
                Ok(PreparedConstraint {
                    observables: vec![observable.clone()],
                    model: Model::Normal {
                        central: *central,
                        sigma: *sigma,
                    },
                })
            }
            Constraint::AsymmetricNormal {
                observable,
                central,
                sigma_plus,
                sigma_minus,
            } => {
                let distribution = Distribution::AsymmetricNormal {
                    central: *central,
                    sigma_plus: *sigma_plus,
                    sigma_minus: *sigma_minus,
                };
                distribution.validate()?;
                Ok(PreparedConstraint {
                    observables: vec![observable.clone()],
                    model: Model::Asymmetric(distribution),
                })
            }
            Constraint::MultivariateNormal {
                observables,
                central,
                covariance,
            } => {
                let n = observables.len();
                if n == 0
                    || central.len() != n
                    || covariance.len() != n
                    || covariance.iter().any(|row| row.len() != n)
                {
                    return Err(config_error(
                        "constraint-shape",
                        format!("multivariate constraint on {n} observables has mismatched shapes"),
                    ));
                }
                let matrix = DMatrix::from_fn(n, n, |i, j| covariance[i][j]);
                let asymmetric = (0..n).any(|i| {
                    (0..i).any(|j| {
                        let scale = (matrix[(i, i)] * matrix[(j, j)]).abs().sqrt();
                        (matrix[(i, j)] - matrix[(j, i)]).abs() > 1e-12 * scale
                    })
                });
                if asymmetric {
                    return Err(config_error(
                        "covariance-asymmetric",
                        "covariance matrix is not symmetric",
                    ));
                }
                let cholesky = matrix.cholesky().ok_or_else(|| {
                    FlvError::Configuration(
                        ErrorInfo::new(
                            "covariance-not-positive-definite",
                            "covariance matrix is not positive definite",
                        )
                        .with_context("observables", n.to_string()),
                    )
                })?;
                let lower = cholesky.l();
                let log_det: f64 = (0..n).map(|i| 2.0 * lower[(i, i)].ln()).sum();
                Ok(PreparedConstraint {
                    observables: observables.clone(),
                    model: Model::Multivariate {
                        central: DVector::from_column_slice(central),
                        lower,
                        log_norm: -0.5 * (n as f64 * (2.0 * PI).ln() + log_det),
                    },
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Model {
    Normal {
        central: f64,
        sigma: f64,
    },
    Asymmetric(Distribution),
    Multivariate {
        central: DVector<f64>,
        lower: DMatrix<f64>,
        log_norm: f64,
    },
}

/// A validated constraint ready for repeated likelihood evaluation.
#[derive(Debug, Clone)]
pub struct PreparedConstraint {
    observables: Vec<ObservableInstance>,
    model: Model,
}

impl PreparedConstraint {
    /// Observables in the order `log_likelihood` expects their predictions.
    pub fn observables(&self) -> &[ObservableInstance] {
        &self.observables
    }

    /// Normalised log-likelihood of `predictions`.
    pub fn log_likelihood(&self, predictions: &[f64]) -> f64 {
        match &self.model {
            Model::Normal { central, sigma } => normal_log_pdf(predictions[0], *central, *sigma),
            Model::Asymmetric(distribution) => distribution.log_pdf(predictions[0]),
            Model::Multivariate {
                central,
                lower,
                log_norm,
            } => {
                let residual = DVector::from_column_slice(predictions) - central;
                match lower.solve_lower_triangular(&residual) {
                    Some(whitened) => log_norm - 0.5 * whitened.norm_squared(),
                    None => f64::NAN,
                }
            }
        }
    }
}

/// A named experimental result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Unique identifier, e.g. `LHCb B0->K*0mumu 2020`.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Likelihood constraints contributed by the measurement.
    pub constraints: Vec<Constraint>,
    /// Parameter values the experimental analysis assumed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub derived_under: BTreeMap<String, f64>,
}

impl Measurement {
    /// Measurement with a single Gaussian constraint.
    pub fn normal(
        name: impl Into<String>,
        observable: ObservableInstance,
        central: f64,
        sigma: f64,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            constraints: vec![Constraint::Normal {
                observable,
                central,
                sigma,
            }],
            derived_under: BTreeMap::new(),
        }
    }

    /// Distinct observable names used by the measurement.
    pub fn observable_names(&self) -> BTreeSet<&str> {
        self.constraints
            .iter()
            .flat_map(|constraint| constraint.observables())
            .map(|obs| obs.name.as_str())
            .collect()
    }
}

/// Supplies measurements by identifier.
pub trait MeasurementSource: Send + Sync {
    /// Loads the named measurements, in the order requested.
    ///
    /// Unknown identifiers are a configuration error.
    fn load_measurements(&self, names: &[String]) -> Result<Vec<Measurement>, FlvError>;
}

/// Measurements held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMeasurements {
    entries: BTreeMap<String, Measurement>,
}

impl InMemoryMeasurements {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a measurement; identifiers must be unique.
    pub fn insert(&mut self, measurement: Measurement) -> Result<(), FlvError> {
        if self.entries.contains_key(&measurement.name) {
            return Err(FlvError::Configuration(
                ErrorInfo::new("measurement-duplicate", "measurement already declared")
                    .with_context("name", measurement.name.clone()),
            ));
        }
        self.entries.insert(measurement.name.clone(), measurement);
        Ok(())
    }

    /// Builds a source from a list, rejecting duplicates.
    pub fn from_measurements(
        measurements: impl IntoIterator<Item = Measurement>,
    ) -> Result<Self, FlvError> {
        let mut source = Self::new();
        for measurement in measurements {
            source.insert(measurement)?;
        }
        Ok(source)
    }

    /// Declared identifiers.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl MeasurementSource for InMemoryMeasurements {
    fn load_measurements(&self, names: &[String]) -> Result<Vec<Measurement>, FlvError> {
        names
            .iter()
            .map(|name| {
                self.entries.get(name).cloned().ok_or_else(|| {
                    FlvError::Configuration(
                        ErrorInfo::new("measurement-unknown", "measurement is not declared")
                            .with_context("name", name.clone()),
                    )
                })
            })
            .collect()
    }
}

/// On-disk YAML layout: a list of measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementFile {
    /// Declared measurements.
    pub measurements: Vec<Measurement>,
}

/// Parses a measurement file.
pub fn parse_measurement_file(text: &str) -> Result<MeasurementFile, FlvError> {
    serde_yaml::from_str(text)
        .map_err(|err| FlvError::Serde(ErrorInfo::new("measurement-file-parse", err.to_string())))
}

/// Measurements read from a YAML file on each load.
#[derive(Debug, Clone)]
pub struct YamlMeasurements {
    path: PathBuf,
}

impl YamlMeasurements {
    /// Source backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MeasurementSource for YamlMeasurements {
    fn load_measurements(&self, names: &[String]) -> Result<Vec<Measurement>, FlvError> {
        let text = fs::read_to_string(&self.path).map_err(|err| {
            FlvError::Serde(
                ErrorInfo::new("measurement-file-read", err.to_string())
                    .with_context("path", self.path.display().to_string()),
            )
        })?;
        let file = parse_measurement_file(&text).map_err(|err| match err {
            FlvError::Serde(info) => {
                FlvError::Serde(info.with_context("path", self.path.display().to_string()))
            }
            other => other,
        })?;
        InMemoryMeasurements::from_measurements(file.measurements)?.load_measurements(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple() -> Constraint {
        Constraint::from_correlation(
            vec![
                ObservableInstance::new("a"),
                ObservableInstance::new("b"),
                ObservableInstance::new("c"),
            ],
            vec![1.0, 2.0, 3.0],
            &[0.1, 0.2, 0.3],
            &[
                vec![1.0, 0.5, 0.0],
                vec![0.5, 1.0, 0.2],
                vec![0.0, 0.2, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn multivariate_matches_product_of_normals_without_correlation() {
        let constraint = Constraint::MultivariateNormal {
            observables: vec![ObservableInstance::new("a"), ObservableInstance::new("b")],
            central: vec![1.0, -1.0],
            covariance: vec![vec![0.04, 0.0], vec![0.0, 0.25]],
        }
        .prepare()
        .unwrap();
        let expected = normal_log_pdf(1.1, 1.0, 0.2) + normal_log_pdf(-0.5, -1.0, 0.5);
        assert!((constraint.log_likelihood(&[1.1, -0.5]) - expected).abs() < 1e-12);
    }

    #[test]
    fn marginalising_drops_rows_and_columns() {
        let excluded = BTreeSet::from(["b".to_string()]);
        match triple().marginalise(&excluded).unwrap() {
            Constraint::MultivariateNormal {
                observables,
                central,
                covariance,
            } => {
                let names: Vec<_> = observables.iter().map(|o| o.name.as_str()).collect();
                assert_eq!(names, ["a", "c"]);
                assert_eq!(central, vec![1.0, 3.0]);
                assert!((covariance[0][0] - 0.01).abs() < 1e-15);
                assert!(covariance[0][1].abs() < 1e-15);
                assert!((covariance[1][1] - 0.09).abs() < 1e-15);
            }
            other => panic!("unexpected constraint {other:?}"),
        }
    }

    #[test]
    fn marginalising_to_one_observable_gives_a_normal() {
        let excluded = BTreeSet::from(["a".to_string(), "c".to_string()]);
        match triple().marginalise(&excluded).unwrap() {
            Constraint::Normal { observable, central, sigma } => {
                assert_eq!(observable.name, "b");
                assert_eq!(central, 2.0);
                assert!((sigma - 0.2).abs() < 1e-15);
            }
            other => panic!("unexpected constraint {other:?}"),
        }
        let all = BTreeSet::from(["a".to_string(), "b".to_string(), "c".to_string()]);
        assert!(triple().marginalise(&all).is_none());
    }

    #[test]
    fn indefinite_covariance_is_rejected() {
        let constraint = Constraint::MultivariateNormal {
            observables: vec![ObservableInstance::new("a"), ObservableInstance::new("b")],
            central: vec![0.0, 0.0],
            covariance: vec![vec![1.0, 2.0], vec![2.0, 1.0]],
        };
        assert!(matches!(constraint.prepare(), Err(FlvError::Configuration(_))));
    }

    #[test]
    fn unknown_measurement_is_a_configuration_error() {
        let source = InMemoryMeasurements::from_measurements([Measurement::normal(
            "Vus",
            ObservableInstance::new("|V_us|"),
            0.2245,
            0.0008,
        )])
        .unwrap();
        assert_eq!(source.load_measurements(&["Vus".into()]).unwrap().len(), 1);
        let err = source.load_measurements(&["nope".into()]).unwrap_err();
        assert!(matches!(err, FlvError::Configuration(_)));
        assert_eq!(err.info().context["name"], "nope");
    }

    #[test]
    fn yaml_measurements_parse() {
        let text = r#"
measurements:
  - name: FL bin
    constraints:
      - type: normal
        observable: { name: "FL(B0->K*0mumu)", args: [2.0] }
        central: 0.7
        sigma: 0.05
    derived_under: { m_b: 4.18 }
"#;
        let file = parse_measurement_file(text).unwrap();
        assert_eq!(file.measurements[0].derived_under["m_b"], 4.18);
        assert_eq!(
            file.measurements[0].observable_names(),
            BTreeSet::from(["FL(B0->K*0mumu)"])
        );
    }
}
