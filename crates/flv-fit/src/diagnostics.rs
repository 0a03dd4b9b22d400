//! Posterior summaries and convergence checks computed from a stored chain.

use flv_core::{ErrorInfo, FlvError};
use serde::{Deserialize, Serialize};

use crate::chain::Chain;

/// Marginal summary of one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    /// Coordinate label.
    pub name: String,
    /// Posterior mean.
    pub mean: f64,
    /// Posterior standard deviation.
    pub std: f64,
    /// 2.5% quantile.
    pub q025: f64,
    /// 16% quantile.
    pub q16: f64,
    /// Median.
    pub median: f64,
    /// 84% quantile.
    pub q84: f64,
    /// 97.5% quantile.
    pub q975: f64,
    /// Split R-hat across walkers; absent when traces are too short.
    pub r_hat: Option<f64>,
}

/// Diagnostics of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Retained samples.
    pub n_samples: usize,
    /// Fraction of retained steps in which each walker moved.
    pub acceptance: Vec<f64>,
    /// Mean of `acceptance`.
    pub mean_acceptance: f64,
    /// Per-coordinate summaries in coordinate order.
    pub parameters: Vec<ParameterSummary>,
}

impl Diagnostics {
    /// Computes every diagnostic from `chain`.
    pub fn from_chain(chain: &Chain) -> Result<Self, FlvError> {
        if chain.is_empty() {
            return Err(FlvError::Sampler(ErrorInfo::new(
                "chain-empty",
                "diagnostics need at least one retained step",
            )));
        }
        let acceptance = acceptance_fractions(chain);
        let mean_acceptance = acceptance.iter().sum::<f64>() / acceptance.len() as f64;
        let parameters = chain
            .parameter_names()
            .iter()
            .enumerate()
            .map(|(idx, name)| summarize(chain, idx, name))
            .collect();
        Ok(Self {
            n_samples: chain.len(),
            acceptance,
            mean_acceptance,
            parameters,
        })
    }

    /// Summary of coordinate `name`.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSummary> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Largest R-hat over all coordinates with a defined value.
    pub fn max_r_hat(&self) -> Option<f64> {
        self.parameters
            .iter()
            .filter_map(|p| p.r_hat)
            .max_by(f64::total_cmp)
    }
}

fn summarize(chain: &Chain, idx: usize, name: &str) -> ParameterSummary {
    let mut values = chain.parameter_values(idx);
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() > 1 {
        (values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    values.sort_by(f64::total_cmp);

    let traces: Vec<Vec<f64>> = (0..chain.n_walkers())
        .map(|walker| chain.walker_trace(walker, idx))
        .collect();
    let views: Vec<&[f64]> = traces.iter().map(Vec::as_slice).collect();
    let r = r_hat(&views);

    ParameterSummary {
        name: name.to_string(),
        mean,
        std,
        q025: quantile_sorted(&values, 0.025),
        q16: quantile_sorted(&values, 0.16),
        median: quantile_sorted(&values, 0.5),
        q84: quantile_sorted(&values, 0.84),
        q975: quantile_sorted(&values, 0.975),
        r_hat: r.is_finite().then_some(r),
    }
}

/// Fraction of retained steps in which each walker's proposal was accepted.
pub fn acceptance_fractions(chain: &Chain) -> Vec<f64> {
    let mut moved = vec![0usize; chain.n_walkers()];
    let mut seen = vec![0usize; chain.n_walkers()];
    for sample in chain.samples() {
        seen[sample.walker] += 1;
        if sample.accepted {
            moved[sample.walker] += 1;
        }
    }
    moved
        .iter()
        .zip(&seen)
        .map(|(&m, &s)| if s == 0 { 0.0 } else { m as f64 / s as f64 })
        .collect()
}

/// Split R-hat (Gelman-Rubin) over several traces of the same coordinate.
///
/// Each trace is split in half; NaN when a trace has fewer than four draws or
/// the within-trace variance vanishes.
pub fn r_hat(chains: &[&[f64]]) -> f64 {
    if chains.is_empty() {
        return f64::NAN;
    }
    let mut halves: Vec<&[f64]> = Vec::with_capacity(2 * chains.len());
    for chain in chains {
        if chain.len() < 4 {
            return f64::NAN;
        }
        let mid = chain.len() / 2;
        halves.push(&chain[..mid]);
        halves.push(&chain[mid..]);
    }
    let min_len = halves.iter().map(|c| c.len()).min().unwrap_or(0);
    let halves: Vec<&[f64]> = halves.iter().map(|c| &c[..min_len]).collect();

    let m = halves.len() as f64;
    let n = min_len as f64;
    let means: Vec<f64> = halves.iter().map(|c| c.iter().sum::<f64>() / n).collect();
    let grand = means.iter().sum::<f64>() / m;
    let between = means.iter().map(|&cm| (cm - grand).powi(2)).sum::<f64>() * n / (m - 1.0);
    let within = halves
        .iter()
        .zip(&means)
        .map(|(c, &cm)| c.iter().map(|&x| (x - cm).powi(2)).sum::<f64>() / (n - 1.0))
        .sum::<f64>()
        / m;
    if within < 1e-30 {
        return f64::NAN;
    }
    let var_plus = (n - 1.0) / n * within + between / n;
    (var_plus / within).sqrt()
}

/// Linearly interpolated quantile of sorted data.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
