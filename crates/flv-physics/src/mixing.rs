//! Neutral meson mixing: mass differences, S_psiK and epsilon_K.

use std::f64::consts::PI;

use flv_core::{FlvError, ParameterStore};

use crate::channels::Meson;
use crate::ckm::{DownQuark, UpQuark};
use crate::common::HBAR_GEV_PS;
use crate::observables::{prediction_fn, EvalContext, ObservableRegistry, PredictionValue};

/// Inami-Lim function `S0(x)` of the top box diagram.
pub fn s0(x: f64) -> f64 {
    let one_minus = 1.0 - x;
    (4.0 * x - 11.0 * x * x + x.powi(3)) / (4.0 * one_minus * one_minus)
        - 3.0 * x.powi(3) * x.ln() / (2.0 * one_minus.powi(3))
}

/// Inami-Lim function `S0(x_c, x_t)` of the mixed charm-top box, to first order in `x_c`.
pub fn s0_mixed(xc: f64, xt: f64) -> f64 {
    xc * ((xt / xc).ln() - 3.0 * xt / (4.0 * (1.0 - xt))
        - 3.0 * xt * xt * xt.ln() / (4.0 * (1.0 - xt).powi(2)))
}

/// Mass difference of the `B0` or `Bs` system in ps^-1.
pub fn delta_m(ctx: &EvalContext<'_>, par: &ParameterStore, meson: Meson) -> Result<f64, FlvError> {
    let spectator = match meson {
        Meson::Bs => DownQuark::S,
        _ => DownQuark::D,
    };
    let label = meson.label();
    let gf = par.get_positive("Gmu")?;
    let m_w = par.get_positive("m_W")?;
    let m_t = par.get_positive("m_t")?;
    let m_meson = par.get_positive(&format!("m_{label}"))?;
    let f_meson = par.get_positive(&format!("f_{label}"))?;
    let bag = par.get_positive(&format!("bag_{label}_1"))?;
    let eta = par.get_positive("eta_tt_B")?;
    let xi_t = ctx.derived.ckm(par)?.xi(UpQuark::T, DownQuark::B, spectator);
    let xt = (m_t / m_w).powi(2);
    let hadronic = m_meson * f_meson * f_meson * bag;
    let gev = gf * gf * m_w * m_w * hadronic * eta * s0(xt) * xi_t.norm_sqr() / (6.0 * PI * PI);
    Ok(gev / HBAR_GEV_PS)
}

/// Mixing-induced CP asymmetry in `B0 -> J/psi K_S`, `sin(2 beta)`.
pub fn s_psik(ctx: &EvalContext<'_>, par: &ParameterStore) -> Result<f64, FlvError> {
    Ok((2.0 * ctx.derived.ckm(par)?.beta()).sin())
}

/// Indirect CP violation in neutral kaon mixing, `|epsilon_K|`.
pub fn eps_k(ctx: &EvalContext<'_>, par: &ParameterStore) -> Result<f64, FlvError> {
    let gf = par.get_positive("Gmu")?;
    let m_w = par.get_positive("m_W")?;
    let m_t = par.get_positive("m_t")?;
    let m_c = par.get_positive("m_c")?;
    let m_k = par.get_positive("m_K0")?;
    let f_k = par.get_positive("f_K0")?;
    let bag = par.get_positive("bag_K0_1")?;
    let kappa = par.get_positive("kappa_epsilon")?;
    let delta_m_k = par.get_positive("DeltaM_K0")? * HBAR_GEV_PS;
    let eta_cc = par.get("eta_cc_K0")?;
    let eta_ct = par.get("eta_ct_K0")?;
    let eta_tt = par.get("eta_tt_K0")?;

    let ckm = ctx.derived.ckm(par)?;
    let lambda = |up| ckm.element(up, DownQuark::S).conj() * ckm.element(up, DownQuark::D);
    let lambda_c = lambda(UpQuark::C);
    let lambda_t = lambda(UpQuark::T);
    let xc = (m_c / m_w).powi(2);
    let xt = (m_t / m_w).powi(2);

    let c_eps = gf * gf * f_k * f_k * m_k * m_w * m_w / (6.0 * 2f64.sqrt() * PI * PI * delta_m_k);
    let bracket =
        lambda_c.re * (eta_cc * xc - eta_ct * s0_mixed(xc, xt)) - lambda_t.re * eta_tt * s0(xt);
    Ok((kappa * c_eps * bag * lambda_t.im * bracket).abs())
}

/// Defines and binds the mixing observables.
pub fn register(observables: &mut ObservableRegistry) -> Result<(), FlvError> {
    for meson in [Meson::B0, Meson::Bs] {
        let name = match meson {
            Meson::Bs => "DeltaM_s",
            _ => "DeltaM_d",
        };
        observables.define(name, format!("Mass difference in the {} system", meson.label()), &[])?;
        observables.attach_prediction(
            name,
            prediction_fn(move |ctx, _, par, _| {
                delta_m(ctx, par, meson).map(PredictionValue::Real)
            }),
        )?;
    }
    observables.define("S_psiK", "Mixing-induced CP asymmetry in B0 -> J/psi K_S", &[])?;
    observables.attach_prediction(
        "S_psiK",
        prediction_fn(|ctx, _, par, _| s_psik(ctx, par).map(PredictionValue::Real)),
    )?;
    observables.define("eps_K", "Indirect CP violation in K0 mixing", &[])?;
    observables.attach_prediction(
        "eps_K",
        prediction_fn(|ctx, _, par, _| eps_k(ctx, par).map(PredictionValue::Real)),
    )?;
    Ok(())
}
