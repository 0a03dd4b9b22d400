//! Fit engine: validation, walker initialisation, the sampling loop and storage.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flv_core::{ErrorInfo, FlvError, ParameterSchema, RngHandle, WilsonCoefficients};
use flv_physics::Catalogue;
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::config::ScanConfig;
use crate::determinism;
use crate::fit::FitSpec;
use crate::likelihood::LogPosterior;
use crate::measurements::{Measurement, MeasurementSource};
use crate::persistence::{self, FitResult, RunManifest, RESULT_SCHEMA};
use crate::sampler::{self, EnsembleSampler, StretchMove, Walkers};

const MAX_INIT_ATTEMPTS: usize = 100;

/// Lifecycle of an [`EnsembleScan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    /// Constructed, nothing validated.
    Uninitialized,
    /// Fit validated against parameters, measurements and observables.
    Ready,
    /// Sampling loop running.
    Sampling,
    /// Chain available.
    Complete,
    /// Validation or sampling failed; the scan cannot be reused.
    Failed,
}

/// A Bayesian fit sampled with an ensemble of walkers.
pub struct EnsembleScan {
    fit: FitSpec,
    config: ScanConfig,
    catalogue: Arc<Catalogue>,
    schema: ParameterSchema,
    source: Arc<dyn MeasurementSource>,
    coefficients: WilsonCoefficients,
    sampler: Option<Box<dyn EnsembleSampler>>,
    state: ScanState,
    posterior: Option<LogPosterior>,
    measurements: Vec<Measurement>,
    result: Option<FitResult>,
}

impl fmt::Debug for EnsembleScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnsembleScan")
            .field("fit", &self.fit.name)
            .field("state", &self.state)
            .finish()
    }
}

impl EnsembleScan {
    /// New scan; nothing is validated until [`EnsembleScan::prepare`] or [`EnsembleScan::run`].
    pub fn new(
        fit: FitSpec,
        config: ScanConfig,
        catalogue: Arc<Catalogue>,
        schema: ParameterSchema,
        source: Arc<dyn MeasurementSource>,
    ) -> Self {
        Self {
            fit,
            config,
            catalogue,
            schema,
            source,
            coefficients: WilsonCoefficients::default(),
            sampler: None,
            state: ScanState::Uninitialized,
            posterior: None,
            measurements: Vec::new(),
            result: None,
        }
    }

    /// Replaces the default stretch move.
    pub fn with_sampler(mut self, sampler: impl EnsembleSampler + 'static) -> Self {
        self.sampler = Some(Box::new(sampler));
        self
    }

    /// Values of coefficients that are held fixed; fitted components start from them.
    pub fn with_coefficients(mut self, coefficients: WilsonCoefficients) -> Self {
        self.coefficients = coefficients;
        self
    }

    /// Current state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The fit being run.
    pub fn fit(&self) -> &FitSpec {
        &self.fit
    }

    /// Scan settings.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Log-posterior, once prepared.
    pub fn posterior(&self) -> Option<&LogPosterior> {
        self.posterior.as_ref()
    }

    /// Result of a completed run.
    pub fn result(&self) -> Option<&FitResult> {
        self.result.as_ref()
    }

    /// Validates the fit; `Uninitialized → Ready`.
    pub fn prepare(&mut self) -> Result<(), FlvError> {
        match self.state {
            ScanState::Uninitialized => {}
            ScanState::Ready => return Ok(()),
            other => return Err(state_error(other, "prepare")),
        }
        match self.validate() {
            Ok((posterior, measurements)) => {
                self.posterior = Some(posterior);
                self.measurements = measurements;
                self.transition(ScanState::Ready);
                Ok(())
            }
            Err(err) => {
                log::error!("fit {} rejected: {err}", self.fit.name);
                self.transition(ScanState::Failed);
                Err(err)
            }
        }
    }

    fn validate(&self) -> Result<(LogPosterior, Vec<Measurement>), FlvError> {
        self.config.validate()?;
        self.fit.check_parameters(&self.schema)?;
        let measurements = self.source.load_measurements(&self.fit.measurements)?;
        for measurement in &measurements {
            for name in measurement.derived_under.keys() {
                if !self.schema.contains(name) {
                    return Err(FlvError::Configuration(
                        ErrorInfo::new(
                            "measurement-parameter-unknown",
                            "measurement refers to an undeclared parameter",
                        )
                        .with_context("measurement", measurement.name.clone())
                        .with_context("parameter", name.clone()),
                    ));
                }
            }
        }
        let posterior = LogPosterior::new(
            &self.fit,
            Arc::clone(&self.catalogue),
            &self.schema,
            measurements.clone(),
            self.coefficients.clone(),
        )?;
        self.config.walker_count(posterior.dimension())?;
        Ok((posterior, measurements))
    }

    /// Runs the whole scan; `Ready → Sampling → Complete`.
    ///
    /// Prepares first when needed. The result is written to the configured run
    /// directory, if any, once sampling has finished.
    pub fn run(&mut self) -> Result<&FitResult, FlvError> {
        if self.state == ScanState::Uninitialized {
            self.prepare()?;
        }
        if self.state != ScanState::Ready {
            return Err(state_error(self.state, "run"));
        }
        self.transition(ScanState::Sampling);
        match self.sample() {
            Ok(result) => {
                log::info!(
                    "fit {} retained {} samples from {} walkers",
                    self.fit.name,
                    result.chain.len(),
                    result.chain.n_walkers()
                );
                self.result = Some(result);
                self.transition(ScanState::Complete);
            }
            Err(err) => {
                log::error!("fit {} aborted: {err}", self.fit.name);
                self.transition(ScanState::Failed);
                return Err(err);
            }
        }
        if let Some(directory) = self.config.output.run_directory.clone() {
            self.save_result(&directory)?;
        }
        self.result
            .as_ref()
            .ok_or_else(|| state_error(self.state, "result"))
    }

    fn sample(&self) -> Result<FitResult, FlvError> {
        let posterior = self
            .posterior
            .as_ref()
            .ok_or_else(|| state_error(self.state, "sample"))?;
        let seed = self.config.seed_policy.master_seed;
        let n_walkers = self.config.walker_count(posterior.dimension())?;
        let default_sampler;
        let kernel: &dyn EnsembleSampler = match &self.sampler {
            Some(sampler) => sampler.as_ref(),
            None => {
                default_sampler = StretchMove::new(self.config.stretch_scale, seed)?;
                &default_sampler
            }
        };

        let execute = || -> Result<(Chain, Walkers), FlvError> {
            let initial = initial_walkers(posterior, n_walkers, seed, self.config.init_spread)?;
            let log_posterior = |x: &[f64]| posterior.log_posterior(x);
            sampler::sample_with(
                kernel,
                initial,
                self.config.steps,
                self.config.burnin,
                posterior.labels(),
                &log_posterior,
                |walkers| {
                    if let Some(err) = posterior.take_fatal() {
                        return Err(err);
                    }
                    if walkers.step() % 100 == 0 {
                        log::debug!("fit {}: step {}", self.fit.name, walkers.step());
                    }
                    Ok(())
                },
            )
        };
        let (chain, _) = match self.config.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|err| {
                    FlvError::Configuration(ErrorInfo::new("thread-pool", err.to_string()))
                })?
                .install(execute)?,
            None => execute()?,
        };

        let provenance = persistence::provenance(&self.fit, &self.config, &self.measurements)?;
        Ok(FitResult {
            schema_version: RESULT_SCHEMA,
            fit: self.fit.clone(),
            config: self.config.clone(),
            measurements: self.measurements.clone(),
            chain,
            provenance,
        })
    }

    /// Writes the result and its manifest to `directory`; returns the result path.
    pub fn save_result(&self, directory: &Path) -> Result<PathBuf, FlvError> {
        let result = self
            .result
            .as_ref()
            .ok_or_else(|| state_error(self.state, "save_result"))?;
        let file_name = self
            .config
            .output
            .result_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.fit.result_file_name()));
        let path = directory.join(&file_name);
        result.store(&path)?;
        RunManifest::for_result(result, file_name)
            .write(&directory.join(&self.config.output.manifest_file))?;
        log::info!("fit {} stored at {}", self.fit.name, path.display());
        Ok(path)
    }

    fn transition(&mut self, next: ScanState) {
        log::info!("fit {}: {:?} -> {:?}", self.fit.name, self.state, next);
        self.state = next;
    }
}

/// Places walkers around the default point with Gaussian jitter.
///
/// Draws that leave the support or coincide with an earlier walker are
/// redrawn. Any evaluation error, or a walker with vanishing posterior, is
/// fatal here.
fn initial_walkers(
    posterior: &LogPosterior,
    n_walkers: usize,
    master_seed: u64,
    spread: f64,
) -> Result<Walkers, FlvError> {
    let start = posterior.starting_point();
    let widths = posterior.widths();
    let mut positions: Vec<Vec<f64>> = Vec::with_capacity(n_walkers);
    for walker in 0..n_walkers {
        let mut rng = RngHandle::from_seed(determinism::walker_seed(master_seed, walker));
        let mut placed = None;
        for _ in 0..MAX_INIT_ATTEMPTS {
            let candidate: Vec<f64> = start
                .iter()
                .zip(widths)
                .map(|(&x0, &width)| {
                    let jitter: f64 = rng.sample(StandardNormal);
                    x0 + spread * width * jitter
                })
                .collect();
            let inside = candidate
                .iter()
                .enumerate()
                .all(|(idx, &x)| posterior.in_support(idx, x));
            if inside && !positions.contains(&candidate) {
                placed = Some(candidate);
                break;
            }
        }
        let position = placed.ok_or_else(|| {
            FlvError::Sampler(
                ErrorInfo::new("walker-initialisation", "could not place walker inside the support")
                    .with_context("walker", walker.to_string())
                    .with_hint("reduce init_spread or check the default parameter values"),
            )
        })?;
        positions.push(position);
    }

    let values = positions
        .par_iter()
        .map(|position| posterior.evaluate(position))
        .collect::<Result<Vec<f64>, FlvError>>()?;
    if let Some(walker) = values.iter().position(|v| *v == f64::NEG_INFINITY) {
        return Err(FlvError::Sampler(
            ErrorInfo::new("walker-zero-posterior", "initial walker has zero posterior density")
                .with_context("walker", walker.to_string()),
        ));
    }
    Walkers::new(positions, values)
}

fn state_error(state: ScanState, operation: &str) -> FlvError {
    FlvError::Sampler(
        ErrorInfo::new("scan-state", "operation not allowed in the current state")
            .with_context("state", format!("{state:?}"))
            .with_context("operation", operation),
    )
}
