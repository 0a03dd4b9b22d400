//! Log-posterior of a fit over its flat coordinate vector.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use flv_core::{
    numeric_error, Complex64, Distribution, ErrorInfo, FlvError, ParameterSchema,
    ParameterStore, ParameterValue, Support, WilsonCoefficients,
};
use flv_physics::{Catalogue, ObservableInstance};

use crate::fit::{ComplexPart, Coordinate, FitSpec};
use crate::measurements::{Measurement, PreparedConstraint};

#[derive(Debug, Clone)]
struct Prior {
    support: Support,
    density: Option<Distribution>,
}

struct ActiveConstraint {
    constraint: PreparedConstraint,
    slots: Vec<usize>,
}

/// Posterior density of a validated fit.
///
/// Shared across walker threads; evaluation never mutates the catalogue or the
/// base parameters. Fatal errors hit during sampling are parked until the
/// engine collects them after the step.
pub struct LogPosterior {
    catalogue: Arc<Catalogue>,
    base: ParameterStore,
    coefficients: WilsonCoefficients,
    coordinates: Vec<Coordinate>,
    priors: Vec<Prior>,
    start: Vec<f64>,
    widths: Vec<f64>,
    instances: Vec<ObservableInstance>,
    constraints: Vec<ActiveConstraint>,
    measurements: Vec<Measurement>,
    fatal: Mutex<Option<FlvError>>,
}

impl std::fmt::Debug for LogPosterior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogPosterior")
            .field("coordinates", &self.coordinates)
            .field("observables", &self.instances.len())
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

impl LogPosterior {
    /// Validates `fit` against the schema, the catalogue and the loaded measurements.
    ///
    /// `coefficients` holds the values of coefficients that are not fitted.
    pub fn new(
        fit: &FitSpec,
        catalogue: Arc<Catalogue>,
        schema: &ParameterSchema,
        measurements: Vec<Measurement>,
        coefficients: WilsonCoefficients,
    ) -> Result<Self, FlvError> {
        fit.check_parameters(schema)?;
        let coordinates = fit.coordinates();
        let base = schema.default_store();

        let mut priors = Vec::with_capacity(coordinates.len());
        let mut start = Vec::with_capacity(coordinates.len());
        let mut widths = Vec::with_capacity(coordinates.len());
        for coordinate in &coordinates {
            let (prior, value, declared_width) = match coordinate {
                Coordinate::FitParameter(name) | Coordinate::Nuisance(name) => {
                    let spec = schema.require(name)?;
                    let value = match spec.value {
                        ParameterValue::Real(value) => value,
                        ParameterValue::Complex(_) => {
                            return Err(FlvError::Configuration(
                                ErrorInfo::new(
                                    "fit-parameter-complex",
                                    "complex parameters cannot be sampled",
                                )
                                .with_context("parameter", name.clone()),
                            ))
                        }
                    };
                    let density = match coordinate {
                        Coordinate::Nuisance(_) => spec.uncertainty.clone(),
                        _ => None,
                    };
                    let width = spec.uncertainty.as_ref().map(Distribution::width);
                    let prior = Prior {
                        support: spec.support,
                        density,
                    };
                    (prior, value, width)
                }
                Coordinate::Coefficient(component) => {
                    if !catalogue.serves_coefficient(&component.name) {
                        return Err(FlvError::Configuration(
                            ErrorInfo::new(
                                "fit-coefficient-unknown",
                                "no prediction in the catalogue reads this coefficient",
                            )
                            .with_context("fit", fit.name.clone())
                            .with_context("coefficient", component.name.clone()),
                        ));
                    }
                    let current = coefficients.get(&component.name);
                    let value = match component.part {
                        ComplexPart::Re => current.re,
                        ComplexPart::Im => current.im,
                    };
                    let prior = Prior {
                        support: Support::Real,
                        density: None,
                    };
                    (prior, value, None)
                }
            };
            let width = declared_width.unwrap_or(if value != 0.0 { value.abs() } else { 1.0 });
            priors.push(prior);
            start.push(value);
            widths.push(width);
        }

        if measurements.len() != fit.measurements.len() {
            return Err(FlvError::Configuration(
                ErrorInfo::new("measurement-count", "measurement source returned a different set")
                    .with_context("requested", fit.measurements.len().to_string())
                    .with_context("loaded", measurements.len().to_string()),
            ));
        }

        let registry = catalogue.observables();
        let excluded: BTreeSet<String> = fit.exclude_observables.iter().cloned().collect();
        for name in &excluded {
            if !registry.contains(name) {
                return Err(unknown_observable(name, None));
            }
        }

        let mut instances: Vec<ObservableInstance> = Vec::new();
        let mut slot_of: BTreeMap<String, usize> = BTreeMap::new();
        let mut constraints = Vec::new();
        for measurement in &measurements {
            for constraint in &measurement.constraints {
                for observable in constraint.observables() {
                    let Some(entry) = registry.get(&observable.name) else {
                        return Err(unknown_observable(&observable.name, Some(&measurement.name)));
                    };
                    if entry.arguments().len() != observable.args.len() {
                        return Err(FlvError::Configuration(
                            ErrorInfo::new(
                                "observable-arguments",
                                "wrong number of kinematic arguments",
                            )
                            .with_context("observable", observable.name.clone())
                            .with_context("measurement", measurement.name.clone()),
                        ));
                    }
                    if !entry.has_prediction() {
                        return Err(FlvError::NotFound(
                            ErrorInfo::new("prediction-not-bound", "observable has no prediction")
                                .with_context("name", observable.name.clone()),
                        ));
                    }
                }
                let Some(active) = constraint.marginalise(&excluded) else {
                    log::debug!(
                        "constraint of {} fully excluded from fit {}",
                        measurement.name,
                        fit.name
                    );
                    continue;
                };
                let prepared = active.prepare().map_err(|err| match err {
                    FlvError::Configuration(info) => FlvError::Configuration(
                        info.with_context("measurement", measurement.name.clone()),
                    ),
                    other => other,
                })?;
                let slots = prepared
                    .observables()
                    .iter()
                    .map(|instance| {
                        let key = instance.to_string();
                        *slot_of.entry(key).or_insert_with(|| {
                            instances.push(instance.clone());
                            instances.len() - 1
                        })
                    })
                    .collect();
                constraints.push(ActiveConstraint {
                    constraint: prepared,
                    slots,
                });
            }
        }
        if constraints.is_empty() {
            return Err(FlvError::Configuration(
                ErrorInfo::new("fit-no-constraints", "no constraint survives the exclusions")
                    .with_context("fit", fit.name.clone()),
            ));
        }

        Ok(Self {
            catalogue,
            base,
            coefficients,
            coordinates,
            priors,
            start,
            widths,
            instances,
            constraints,
            measurements,
            fatal: Mutex::new(None),
        })
    }

    /// Sampled coordinates in vector order.
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    /// Coordinate labels in vector order.
    pub fn labels(&self) -> Vec<String> {
        self.coordinates.iter().map(Coordinate::label).collect()
    }

    /// Number of sampled coordinates.
    pub fn dimension(&self) -> usize {
        self.coordinates.len()
    }

    /// Default values of the coordinates.
    pub fn starting_point(&self) -> &[f64] {
        &self.start
    }

    /// Characteristic scale of each coordinate for walker initialisation.
    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    /// Whether `value` lies in the support of coordinate `idx`.
    pub fn in_support(&self, idx: usize, value: f64) -> bool {
        self.priors
            .get(idx)
            .is_some_and(|prior| prior.support.contains(value))
    }

    /// Distinct observable instances evaluated per candidate.
    pub fn observables(&self) -> &[ObservableInstance] {
        &self.instances
    }

    /// Measurements entering the likelihood.
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Evaluates the log-posterior, surfacing every error.
    pub fn evaluate(&self, x: &[f64]) -> Result<f64, FlvError> {
        if x.len() != self.coordinates.len() {
            return Err(FlvError::Sampler(
                ErrorInfo::new("candidate-dimension", "candidate has the wrong dimension")
                    .with_context("expected", self.coordinates.len().to_string())
                    .with_context("got", x.len().to_string()),
            ));
        }
        let mut log_prior = 0.0;
        let mut overrides = Vec::new();
        let mut wc = self.coefficients.clone();
        for ((coordinate, prior), &value) in self.coordinates.iter().zip(&self.priors).zip(x) {
            if !value.is_finite() {
                return Err(numeric_error(
                    "candidate-non-finite",
                    format!("coordinate {} is {value}", coordinate.label()),
                ));
            }
            if !prior.support.contains(value) {
                return Err(FlvError::Domain(
                    ErrorInfo::new("parameter-out-of-support", "parameter outside its support")
                        .with_context("parameter", coordinate.label())
                        .with_context("value", value.to_string()),
                ));
            }
            if let Some(density) = &prior.density {
                log_prior += density.log_pdf(value);
            }
            match coordinate {
                Coordinate::FitParameter(name) | Coordinate::Nuisance(name) => {
                    overrides.push((name.as_str(), value));
                }
                Coordinate::Coefficient(component) => {
                    let current = wc.get(&component.name);
                    let updated = match component.part {
                        ComplexPart::Re => Complex64::new(value, current.im),
                        ComplexPart::Im => Complex64::new(current.re, value),
                    };
                    wc.set(component.name.clone(), updated);
                }
            }
        }
        if log_prior == f64::NEG_INFINITY {
            return Ok(log_prior);
        }

        let par = self.base.with_overrides(overrides)?;
        let predictions = self
            .instances
            .iter()
            .map(|instance| self.catalogue.evaluate_instance(instance, &wc, &par))
            .collect::<Result<Vec<f64>, FlvError>>()?;

        let mut log_likelihood = 0.0;
        let mut values = Vec::new();
        for active in &self.constraints {
            values.clear();
            values.extend(active.slots.iter().map(|&slot| predictions[slot]));
            log_likelihood += active.constraint.log_likelihood(&values);
        }
        let total = log_prior + log_likelihood;
        if total.is_nan() {
            return Err(numeric_error("log-posterior-nan", "log-posterior evaluated to NaN"));
        }
        Ok(total)
    }

    /// Log-posterior as seen by the sampler.
    ///
    /// Domain and numeric failures score −∞. Fatal errors also score −∞ and are
    /// kept for [`LogPosterior::take_fatal`].
    pub fn log_posterior(&self, x: &[f64]) -> f64 {
        match self.evaluate(x) {
            Ok(value) => value,
            Err(err @ FlvError::Domain(_)) => {
                log::debug!("candidate rejected: {err}");
                f64::NEG_INFINITY
            }
            Err(err @ FlvError::Numeric(_)) => {
                log::warn!("non-finite evaluation rejected: {err}");
                f64::NEG_INFINITY
            }
            Err(err) => {
                let mut slot = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.is_none() {
                    log::error!("fatal error during sampling: {err}");
                    *slot = Some(err);
                }
                f64::NEG_INFINITY
            }
        }
    }

    /// First fatal error recorded since the last call.
    pub fn take_fatal(&self) -> Option<FlvError> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

fn unknown_observable(name: &str, measurement: Option<&str>) -> FlvError {
    let mut info = ErrorInfo::new("observable-unknown", "observable is not defined")
        .with_context("name", name);
    if let Some(measurement) = measurement {
        info = info.with_context("measurement", measurement);
    }
    FlvError::Configuration(info)
}
