//! Leading-order running of couplings, quark masses and dipole coefficients.
//!
//! Only the five-flavour one-loop evolution is implemented; amplitude code
//! calls these helpers at the renormalisation scale of its sector.

use std::f64::consts::PI;

use flv_core::{domain_error, numeric_error, FlvError, ParameterStore};

/// One-loop QCD beta function coefficient for five active flavours.
const BETA0_NF5: f64 = 23.0 / 3.0;
/// Sum of `N_c Q_f^2` over fermions lighter than the Z.
const QED_CHARGE_SUM: f64 = 20.0 / 3.0;

/// Gauge couplings at one scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Couplings {
    /// Strong coupling.
    pub alpha_s: f64,
    /// Electromagnetic coupling.
    pub alpha_e: f64,
}

/// Strong coupling at `scale` evolved from `alpha_s(m_Z)`.
pub fn alpha_s(par: &ParameterStore, scale: f64) -> Result<f64, FlvError> {
    let alpha_mz = par.get_positive("alpha_s")?;
    let mz = par.get_positive("m_Z")?;
    check_scale(scale)?;
    let denominator = 1.0 + alpha_mz * BETA0_NF5 / (2.0 * PI) * (scale / mz).ln();
    if denominator <= 0.0 {
        return Err(domain_error(
            "alpha-s-landau-pole",
            format!("scale {scale} GeV lies below the one-loop Landau pole"),
        ));
    }
    Ok(alpha_mz / denominator)
}

/// Electromagnetic coupling at `scale` evolved from `alpha_e(m_Z)`.
pub fn alpha_e(par: &ParameterStore, scale: f64) -> Result<f64, FlvError> {
    let alpha_mz = par.get_positive("alpha_e")?;
    let mz = par.get_positive("m_Z")?;
    check_scale(scale)?;
    let denominator = 1.0 - alpha_mz * 2.0 * QED_CHARGE_SUM / (3.0 * PI) * (scale / mz).ln();
    let value = alpha_mz / denominator;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(numeric_error(
            "alpha-e-running",
            format!("alpha_e at {scale} GeV is not finite"),
        ))
    }
}

/// Both couplings at `scale`.
pub fn couplings(par: &ParameterStore, scale: f64) -> Result<Couplings, FlvError> {
    Ok(Couplings {
        alpha_s: alpha_s(par, scale)?,
        alpha_e: alpha_e(par, scale)?,
    })
}

/// MSbar bottom mass at `scale` from `m_b(m_b)`.
pub fn m_b(par: &ParameterStore, scale: f64) -> Result<f64, FlvError> {
    running_mass(par, "m_b", scale)
}

/// MSbar charm mass at `scale` from `m_c(m_c)`.
pub fn m_c(par: &ParameterStore, scale: f64) -> Result<f64, FlvError> {
    running_mass(par, "m_c", scale)
}

fn running_mass(par: &ParameterStore, name: &str, scale: f64) -> Result<f64, FlvError> {
    let mass = par.get_positive(name)?;
    let ratio = alpha_s(par, scale)? / alpha_s(par, mass)?;
    Ok(mass * ratio.powf(12.0 / 23.0))
}

/// LO evolution factor of the photon dipole coefficient from `high` down to `low`.
pub fn dipole_evolution(par: &ParameterStore, high: f64, low: f64) -> Result<f64, FlvError> {
    let eta = alpha_s(par, high)? / alpha_s(par, low)?;
    Ok(eta.powf(16.0 / 23.0))
}

fn check_scale(scale: f64) -> Result<(), FlvError> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(domain_error(
            "scale-not-positive",
            format!("renormalisation scale must be positive, got {scale}"),
        ))
    }
}
