#![deny(missing_docs)]
#![doc = include_str!("../docs/fit-engine.md")]

/// Post-burn-in chain storage.
pub mod chain;
/// YAML scan configuration and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Acceptance, marginal summaries and split R-hat.
pub mod diagnostics;
/// Fit engine state machine and sampling loop.
pub mod engine;
/// Fit descriptions and coefficient components.
pub mod fit;
/// Log-posterior of a fit.
pub mod likelihood;
/// Measurements, constraints and measurement sources.
pub mod measurements;
/// Result files, manifests and provenance.
pub mod persistence;
/// Ensemble sampler trait and the stretch move.
pub mod sampler;

pub use chain::{Chain, Sample};
pub use config::{OutputConfig, ScanConfig, SeedPolicy};
pub use diagnostics::{r_hat, Diagnostics, ParameterSummary};
pub use engine::{EnsembleScan, ScanState};
pub use fit::{CoefficientComponent, ComplexPart, Coordinate, FitSpec};
pub use likelihood::LogPosterior;
pub use measurements::{
    Constraint, InMemoryMeasurements, Measurement, MeasurementSource, YamlMeasurements,
};
pub use persistence::{FitResult, RunManifest};
pub use sampler::{sample, EnsembleSampler, LogPosteriorFn, StretchMove, Walkers};
