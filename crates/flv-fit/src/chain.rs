//! Post-burn-in samples of an ensemble run.

use flv_core::{ErrorInfo, FlvError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::sampler::Walkers;

/// State of one walker at one retained step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Step index, counted from the start of the run.
    pub step: usize,
    /// Walker index.
    pub walker: usize,
    /// Position in coordinate order.
    pub position: Vec<f64>,
    /// Log-posterior at `position`; −∞ is stored as `null`.
    #[serde(serialize_with = "serialize_log", deserialize_with = "deserialize_log")]
    pub log_posterior: f64,
    /// Whether the walker moved in this step.
    pub accepted: bool,
}

fn serialize_log<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_some(value)
    } else {
        serializer.serialize_none()
    }
}

fn deserialize_log<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
}

/// Samples keyed by (step, walker), in step-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    parameter_names: Vec<String>,
    n_walkers: usize,
    first_step: usize,
    samples: Vec<Sample>,
}

impl Chain {
    /// Empty chain whose first retained step is `first_step`.
    pub fn new(
        parameter_names: Vec<String>,
        n_walkers: usize,
        first_step: usize,
    ) -> Result<Self, FlvError> {
        if parameter_names.is_empty() || n_walkers == 0 {
            return Err(FlvError::Sampler(ErrorInfo::new(
                "chain-shape",
                "chain needs at least one parameter and one walker",
            )));
        }
        Ok(Self {
            parameter_names,
            n_walkers,
            first_step,
            samples: Vec::new(),
        })
    }

    /// Appends every walker of the ensemble produced by step `step`.
    pub fn push(&mut self, step: usize, walkers: &Walkers) -> Result<(), FlvError> {
        if walkers.len() != self.n_walkers || walkers.dimension() != self.parameter_names.len() {
            return Err(FlvError::Sampler(
                ErrorInfo::new("chain-shape", "ensemble does not match the chain layout")
                    .with_context("step", step.to_string()),
            ));
        }
        for (walker, ((position, &log_posterior), &accepted)) in walkers
            .positions()
            .iter()
            .zip(walkers.log_posterior())
            .zip(walkers.accepted())
            .enumerate()
        {
            self.samples.push(Sample {
                step,
                walker,
                position: position.clone(),
                log_posterior,
                accepted,
            });
        }
        Ok(())
    }

    /// Coordinate labels.
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// Index of coordinate `name`.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameter_names.iter().position(|n| n == name)
    }

    /// Ensemble size.
    pub fn n_walkers(&self) -> usize {
        self.n_walkers
    }

    /// First retained step, i.e. the burn-in length.
    pub fn first_step(&self) -> usize {
        self.first_step
    }

    /// Number of retained steps.
    pub fn n_steps(&self) -> usize {
        self.samples.len() / self.n_walkers
    }

    /// Total number of samples, `n_walkers × n_steps`.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing was retained.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Values of coordinate `param` over all samples.
    pub fn parameter_values(&self, param: usize) -> Vec<f64> {
        self.samples.iter().map(|s| s.position[param]).collect()
    }

    /// Trace of coordinate `param` for one walker, in step order.
    pub fn walker_trace(&self, walker: usize, param: usize) -> Vec<f64> {
        self.samples
            .iter()
            .filter(|s| s.walker == walker)
            .map(|s| s.position[param])
            .collect()
    }

    /// Log-posterior values over all samples.
    pub fn log_posterior_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.log_posterior).collect()
    }

    /// Sample with the largest log-posterior.
    pub fn best(&self) -> Option<&Sample> {
        self.samples
            .iter()
            .filter(|s| !s.log_posterior.is_nan())
            .max_by(|a, b| a.log_posterior.total_cmp(&b.log_posterior))
    }
}
