//! Ensemble sampler interface and the affine-invariant stretch move.

use flv_core::{ErrorInfo, FlvError, RngHandle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::determinism;

/// Log-posterior callback; returns −∞ for rejected candidates.
pub type LogPosteriorFn<'a> = dyn Fn(&[f64]) -> f64 + Sync + 'a;

/// Positions and log-posterior values of every walker after a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Walkers {
    positions: Vec<Vec<f64>>,
    log_posterior: Vec<f64>,
    accepted: Vec<bool>,
    step: usize,
}

impl Walkers {
    /// Initial ensemble before any step.
    pub fn new(positions: Vec<Vec<f64>>, log_posterior: Vec<f64>) -> Result<Self, FlvError> {
        let accepted = vec![false; positions.len()];
        Self::from_parts(positions, log_posterior, accepted, 0)
    }

    /// Ensemble after `step` completed steps.
    pub fn from_parts(
        positions: Vec<Vec<f64>>,
        log_posterior: Vec<f64>,
        accepted: Vec<bool>,
        step: usize,
    ) -> Result<Self, FlvError> {
        let dimension = positions.first().map(Vec::len).unwrap_or(0);
        if positions.is_empty()
            || dimension == 0
            || positions.iter().any(|p| p.len() != dimension)
            || log_posterior.len() != positions.len()
            || accepted.len() != positions.len()
        {
            return Err(FlvError::Sampler(
                ErrorInfo::new("ensemble-shape", "walker arrays have inconsistent shapes")
                    .with_context("walkers", positions.len().to_string())
                    .with_context("log_posterior", log_posterior.len().to_string()),
            ));
        }
        Ok(Self {
            positions,
            log_posterior,
            accepted,
            step,
        })
    }

    /// Number of walkers.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false for a constructed ensemble.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Length of each position vector.
    pub fn dimension(&self) -> usize {
        self.positions[0].len()
    }

    /// Walker positions.
    pub fn positions(&self) -> &[Vec<f64>] {
        &self.positions
    }

    /// Log-posterior at each position.
    pub fn log_posterior(&self) -> &[f64] {
        &self.log_posterior
    }

    /// Whether each walker moved in the step that produced this ensemble.
    pub fn accepted(&self) -> &[bool] {
        &self.accepted
    }

    /// Number of completed steps.
    pub fn step(&self) -> usize {
        self.step
    }
}

/// One synchronous update of the whole ensemble.
///
/// Implementations evaluate every walker before returning, so a call is a
/// barrier between steps.
pub trait EnsembleSampler: Send + Sync {
    /// Advances the ensemble by one step.
    fn advance(
        &self,
        walkers: &Walkers,
        log_posterior: &LogPosteriorFn<'_>,
    ) -> Result<Walkers, FlvError>;
}

/// Goodman & Weare stretch move with the red/blue split of the ensemble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchMove {
    scale: f64,
    master_seed: u64,
}

impl StretchMove {
    /// Stretch move with scale `a > 1`.
    pub fn new(scale: f64, master_seed: u64) -> Result<Self, FlvError> {
        if !(scale > 1.0 && scale.is_finite()) {
            return Err(FlvError::Sampler(
                ErrorInfo::new("stretch-scale", "stretch scale must exceed 1")
                    .with_context("scale", scale.to_string()),
            ));
        }
        Ok(Self { scale, master_seed })
    }

    /// Scale parameter `a`.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Draws `z` from `g(z) ∝ 1/sqrt(z)` on `[1/a, a]`.
    fn draw_z(&self, rng: &mut RngHandle) -> f64 {
        let u = rng.uniform();
        let root = (self.scale - 1.0) * u + 1.0;
        root * root / self.scale
    }
}

fn accept(proposed: f64, current: f64, log_ratio_jacobian: f64, u: f64) -> bool {
    if proposed.is_nan() || proposed == f64::NEG_INFINITY {
        return false;
    }
    if current == f64::NEG_INFINITY || current.is_nan() {
        return true;
    }
    u.ln() < log_ratio_jacobian + proposed - current
}

impl EnsembleSampler for StretchMove {
    fn advance(
        &self,
        walkers: &Walkers,
        log_posterior: &LogPosteriorFn<'_>,
    ) -> Result<Walkers, FlvError> {
        let n = walkers.len();
        if n < 2 || n % 2 != 0 {
            return Err(FlvError::Sampler(
                ErrorInfo::new("ensemble-size", "stretch move needs an even number of walkers")
                    .with_context("walkers", n.to_string()),
            ));
        }
        let half = n / 2;
        let dimension = walkers.dimension();
        let mut positions = walkers.positions.clone();
        let mut values = walkers.log_posterior.clone();
        let mut accepted = vec![false; n];

        for (part, (active, complement)) in [(0..half, half..n), (half..n, 0..half)]
            .into_iter()
            .enumerate()
        {
            let updates: Vec<Option<(Vec<f64>, f64)>> = active
                .clone()
                .into_par_iter()
                .map(|k| {
                    let seed = determinism::stretch_seed(self.master_seed, walkers.step, part, k);
                    let mut rng = RngHandle::from_seed(seed);
                    let z = self.draw_z(&mut rng);
                    let j = complement.start + rng.index(complement.len());
                    let proposal: Vec<f64> = positions[j]
                        .iter()
                        .zip(&positions[k])
                        .map(|(xj, xk)| xj + z * (xk - xj))
                        .collect();
                    let value = log_posterior(&proposal);
                    let jacobian = (dimension as f64 - 1.0) * z.ln();
                    accept(value, values[k], jacobian, rng.uniform()).then_some((proposal, value))
                })
                .collect();
            for (k, update) in active.zip(updates) {
                if let Some((proposal, value)) = update {
                    positions[k] = proposal;
                    values[k] = value;
                    accepted[k] = true;
                }
            }
        }

        Walkers::from_parts(positions, values, accepted, walkers.step + 1)
    }
}

/// Runs `steps` ensemble steps from `initial`, keeping steps at index `burnin` and later.
///
/// `after_step` runs between steps and may abort the run.
pub fn sample_with<F>(
    sampler: &dyn EnsembleSampler,
    initial: Walkers,
    steps: usize,
    burnin: usize,
    parameter_names: Vec<String>,
    log_posterior: &LogPosteriorFn<'_>,
    mut after_step: F,
) -> Result<(Chain, Walkers), FlvError>
where
    F: FnMut(&Walkers) -> Result<(), FlvError>,
{
    let mut chain = Chain::new(parameter_names, initial.len(), burnin)?;
    let mut walkers = initial;
    for step in 0..steps {
        let next = sampler.advance(&walkers, log_posterior)?;
        if next.len() != walkers.len() || next.dimension() != walkers.dimension() {
            return Err(FlvError::Sampler(
                ErrorInfo::new("ensemble-changed", "sampler changed the ensemble shape")
                    .with_context("step", step.to_string()),
            ));
        }
        walkers = next;
        after_step(&walkers)?;
        if step >= burnin {
            chain.push(step, &walkers)?;
        }
    }
    Ok((chain, walkers))
}

/// Runs `steps` ensemble steps and returns the chain after burn-in.
pub fn sample(
    sampler: &dyn EnsembleSampler,
    initial: Walkers,
    steps: usize,
    burnin: usize,
    parameter_names: Vec<String>,
    log_posterior: &LogPosteriorFn<'_>,
) -> Result<Chain, FlvError> {
    sample_with(sampler, initial, steps, burnin, parameter_names, log_posterior, |_| Ok(()))
        .map(|(chain, _)| chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_stays_within_scale_bounds() {
        let stretch = StretchMove::new(2.0, 1).unwrap();
        let mut rng = RngHandle::from_seed(5);
        for _ in 0..1000 {
            let z = stretch.draw_z(&mut rng);
            assert!((0.5..=2.0).contains(&z));
        }
    }

    #[test]
    fn acceptance_rules_handle_infinities() {
        assert!(!accept(f64::NAN, 0.0, 0.0, 0.5));
        assert!(!accept(f64::NEG_INFINITY, f64::NEG_INFINITY, 0.0, 0.0));
        assert!(accept(-1e6, f64::NEG_INFINITY, 0.0, 0.99));
        assert!(accept(1.0, 0.0, 0.0, 0.99));
        assert!(!accept(-10.0, 0.0, 0.0, 0.5));
    }

    #[test]
    fn odd_ensembles_are_rejected() {
        let stretch = StretchMove::new(2.0, 1).unwrap();
        let walkers = Walkers::new(vec![vec![0.0]; 3], vec![0.0; 3]).unwrap();
        let err = stretch.advance(&walkers, &|_: &[f64]| 0.0).unwrap_err();
        assert!(matches!(err, FlvError::Sampler(_)));
    }
}
