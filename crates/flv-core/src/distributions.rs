//! Probability distributions used for parameter uncertainties and measurements.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::{config_error, FlvError};

/// One-dimensional probability distribution with a closed-form log density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Distribution {
    /// Gaussian with the given central value and standard deviation.
    Normal {
        /// Mean of the distribution.
        central: f64,
        /// Standard deviation.
        sigma: f64,
    },
    /// Split Gaussian with different widths above and below the central value.
    AsymmetricNormal {
        /// Mode of the distribution.
        central: f64,
        /// Width above the central value.
        sigma_plus: f64,
        /// Width below the central value.
        sigma_minus: f64,
    },
    /// Flat density on `[low, high]`.
    Uniform {
        /// Lower edge.
        low: f64,
        /// Upper edge.
        high: f64,
    },
}

impl Distribution {
    /// Convenience constructor for a Gaussian.
    pub fn normal(central: f64, sigma: f64) -> Self {
        Distribution::Normal { central, sigma }
    }

    /// Checks that widths are positive and finite.
    pub fn validate(&self) -> Result<(), FlvError> {
        let ok = match *self {
            Distribution::Normal { central, sigma } => central.is_finite() && sigma > 0.0,
            Distribution::AsymmetricNormal {
                central,
                sigma_plus,
                sigma_minus,
            } => central.is_finite() && sigma_plus > 0.0 && sigma_minus > 0.0,
            Distribution::Uniform { low, high } => {
                low.is_finite() && high.is_finite() && low < high
            }
        };
        if ok {
            Ok(())
        } else {
            Err(config_error(
                "distribution-invalid",
                format!("invalid distribution parameters: {self:?}"),
            ))
        }
    }

    /// Central value used as starting point and for pulls.
    pub fn central(&self) -> f64 {
        match *self {
            Distribution::Normal { central, .. } => central,
            Distribution::AsymmetricNormal { central, .. } => central,
            Distribution::Uniform { low, high } => 0.5 * (low + high),
        }
    }

    /// Characteristic width, used to scale walker perturbations.
    pub fn width(&self) -> f64 {
        match *self {
            Distribution::Normal { sigma, .. } => sigma,
            Distribution::AsymmetricNormal {
                sigma_plus,
                sigma_minus,
                ..
            } => 0.5 * (sigma_plus + sigma_minus),
            Distribution::Uniform { low, high } => (high - low) / 12f64.sqrt(),
        }
    }

    /// Normalised natural logarithm of the density at `x`.
    pub fn log_pdf(&self, x: f64) -> f64 {
        match *self {
            Distribution::Normal { central, sigma } => normal_log_pdf(x, central, sigma),
            Distribution::AsymmetricNormal {
                central,
                sigma_plus,
                sigma_minus,
            } => {
                let norm = (2.0 / PI).sqrt() / (sigma_plus + sigma_minus);
                let sigma = if x >= central { sigma_plus } else { sigma_minus };
                let pull = (x - central) / sigma;
                norm.ln() - 0.5 * pull * pull
            }
            Distribution::Uniform { low, high } => {
                if (low..=high).contains(&x) {
                    -(high - low).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
        }
    }
}

/// Log density of a Gaussian.
pub fn normal_log_pdf(x: f64, central: f64, sigma: f64) -> f64 {
    let pull = (x - central) / sigma;
    -0.5 * pull * pull - sigma.ln() - 0.5 * (2.0 * PI).ln()
}

/// Physical support of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Support {
    /// Any finite real value.
    #[default]
    Real,
    /// Strictly positive values (masses, decay constants, bag parameters).
    Positive,
    /// Closed interval.
    Interval {
        /// Lower edge.
        low: f64,
        /// Upper edge.
        high: f64,
    },
}

impl Support {
    /// Whether `x` lies inside the support.
    pub fn contains(&self, x: f64) -> bool {
        if !x.is_finite() {
            return false;
        }
        match *self {
            Support::Real => true,
            Support::Positive => x > 0.0,
            Support::Interval { low, high } => (low..=high).contains(&x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_is_normalised_at_mode() {
        let dist = Distribution::normal(1.0, 2.0);
        let expected = -(2.0f64).ln() - 0.5 * (2.0 * PI).ln();
        assert!((dist.log_pdf(1.0) - expected).abs() < 1e-14);
    }

    #[test]
    fn asymmetric_normal_uses_side_width() {
        let dist = Distribution::AsymmetricNormal {
            central: 0.0,
            sigma_plus: 1.0,
            sigma_minus: 2.0,
        };
        let above = dist.log_pdf(1.0) - dist.log_pdf(0.0);
        let below = dist.log_pdf(-2.0) - dist.log_pdf(0.0);
        assert!((above + 0.5).abs() < 1e-14);
        assert!((below + 0.5).abs() < 1e-14);
    }

    #[test]
    fn uniform_outside_is_impossible() {
        let dist = Distribution::Uniform { low: 0.0, high: 2.0 };
        assert_eq!(dist.log_pdf(3.0), f64::NEG_INFINITY);
        assert!((dist.log_pdf(1.0) + (2.0f64).ln()).abs() < 1e-14);
    }

    #[test]
    fn positive_support_rejects_zero_and_nan() {
        assert!(!Support::Positive.contains(0.0));
        assert!(!Support::Positive.contains(f64::NAN));
        assert!(Support::Positive.contains(1e-12));
    }
}
