//! K -> pi nu nubar branching ratios summed over neutrino flavours.

use std::f64::consts::PI;

use flv_core::{Complex64, FlvError, ParameterStore, WilsonCoefficients};

use crate::channels::{Neutrino, QuarkTransition};
use crate::ckm::{DownQuark, UpQuark};
use crate::observables::{prediction_fn, EvalContext, ObservableRegistry, PredictionValue};
use crate::running;
use crate::wilson::{self, Sector};

/// Amplitude for fixed neutrino flavours in the normalisation of [`br_normalization`].
pub fn amplitude(
    ctx: &EvalContext<'_>,
    wc: &WilsonCoefficients,
    par: &ParameterStore,
    nu1: Neutrino,
    nu2: Neutrino,
) -> Result<Complex64, FlvError> {
    let ckm = ctx.derived.ckm(par)?;
    let xi_t = ckm.xi(UpQuark::T, DownQuark::S, DownQuark::D);
    let xi_c = ckm.xi(UpQuark::C, DownQuark::S, DownQuark::D);
    let sector = Sector::Dineutrino(QuarkTransition::Sd, nu1, nu2);
    let scale = ctx.config.renormalization_scale.kdecays;
    let coefficients = wilson::total_coefficients(wc, sector, scale, par)?;
    let label = sector.label();
    let s2w = par.get_positive("s2w")?;
    let cl = coefficients.get(&format!("CL_{label}"))?;
    let cr = coefficients.get(&format!("CR_{label}"))?;
    let x = -(cl + cr) * s2w;
    let mut amp = xi_t * x / s2w;
    if nu1 == nu2 {
        let vus = ckm.element(UpQuark::U, DownQuark::S).norm();
        let charm = charm_contribution(par)? + par.get("deltaPcu")?;
        amp += xi_c * charm * vus.powi(4) / s2w;
    }
    Ok(amp)
}

/// Charm quark contribution `P_c(X)` (approximate NNLO result).
pub fn charm_contribution(par: &ParameterStore) -> Result<f64, FlvError> {
    let mc = par.get_positive("m_c")?;
    let alpha_s = par.get_positive("alpha_s")?;
    Ok(0.379 * (mc / 1.3).powf(2.155) * (alpha_s / 0.1187).powf(-1.417))
}

/// Normalisation to the measured `K+ -> pi0 e+ nu` branching ratio.
pub fn br_normalization(ctx: &EvalContext<'_>, par: &ParameterStore) -> Result<f64, FlvError> {
    let alpha_e = running::alpha_e(par, ctx.config.renormalization_scale.kdecays)?;
    let br_kl3 = par.get_positive("BR(K+->pienu)")?;
    let vus = ctx.derived.ckm(par)?.element(UpQuark::U, DownQuark::S).norm();
    Ok(alpha_e * alpha_e * br_kl3 / (2.0 * PI * PI * vus * vus))
}

/// `BR(K+ -> pi+ nu_i nubar_j)`.
pub fn br_kplus(
    ctx: &EvalContext<'_>,
    wc: &WilsonCoefficients,
    par: &ParameterStore,
    nu1: Neutrino,
    nu2: Neutrino,
) -> Result<f64, FlvError> {
    Ok(amplitude(ctx, wc, par, nu1, nu2)?.norm_sqr() * br_normalization(ctx, par)?)
}

/// `BR(K_L -> pi0 nu_i nubar_j)`.
pub fn br_klong(
    ctx: &EvalContext<'_>,
    wc: &WilsonCoefficients,
    par: &ParameterStore,
    nu1: Neutrino,
    nu2: Neutrino,
) -> Result<f64, FlvError> {
    let im = amplitude(ctx, wc, par, nu1, nu2)?.im;
    let lifetime_ratio = par.get_positive("tau_KL")? / par.get_positive("tau_K+")?;
    Ok(im * im * br_normalization(ctx, par)? * lifetime_ratio)
}

/// Sum of `per_flavour` over all neutrino flavour pairs in fixed order.
pub fn flavour_sum<F>(mut per_flavour: F) -> Result<f64, FlvError>
where
    F: FnMut(Neutrino, Neutrino) -> Result<f64, FlvError>,
{
    let mut total = 0.0;
    for nu1 in Neutrino::ALL {
        for nu2 in Neutrino::ALL {
            total += per_flavour(nu1, nu2)?;
        }
    }
    Ok(total)
}

/// Defines and binds `BR(K+->pinunu)` and `BR(KL->pinunu)`.
pub fn register(observables: &mut ObservableRegistry) -> Result<(), FlvError> {
    observables.define("BR(K+->pinunu)", "Branching ratio of K+ -> pi+ nu nubar", &[])?;
    observables.attach_prediction(
        "BR(K+->pinunu)",
        prediction_fn(|ctx, wc, par, _| {
            flavour_sum(|nu1, nu2| br_kplus(ctx, wc, par, nu1, nu2)).map(PredictionValue::Real)
        }),
    )?;
    observables.define("BR(KL->pinunu)", "Branching ratio of K_L -> pi0 nu nubar", &[])?;
    observables.attach_prediction(
        "BR(KL->pinunu)",
        prediction_fn(|ctx, wc, par, _| {
            flavour_sum(|nu1, nu2| br_klong(ctx, wc, par, nu1, nu2)).map(PredictionValue::Real)
        }),
    )?;
    Ok(())
}
