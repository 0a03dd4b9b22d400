//! Exclusive B -> V l+ l- decays: amplitude assembly and q2 observables.

use std::f64::consts::PI;

use flv_core::{
    conjugate_coefficients, conjugate_parameters, domain_error, Complex64, FlvError,
    ParameterStore, PhysicsConfig, WilsonCoefficients,
};

use crate::auxiliary::AuxContext;
use crate::channels::{Lepton, QuarkTransition, VectorChannel};
use crate::ckm::{CkmMatrix, UpQuark};
use crate::common::{beta_l, lambda_k, lifetime_to_gev, simpson};
use crate::formfactors::{FormFactorComponent as Ff, FormFactors};
use crate::helicity::{Helicity, HelicityAmplitudes, Polarization};
use crate::observables::{prediction_fn, EvalContext, ObservableRegistry, PredictionValue};
use crate::running;
use crate::wilson::{self, EffectiveCoefficients, Sector};

/// Above this q2 (GeV^2) spectator scattering is identically zero.
pub const SPECTATOR_SCATTERING_Q2_MAX: f64 = 9.0;

/// Subintervals used for q2-binned averages.
const BIN_INTERVALS: usize = 10;

/// Overall normalisation `4 G_F / sqrt(2) xi_t alpha_e / (4 pi)`.
///
/// Exactly zero at and below the dilepton threshold `q2 <= 4 m_l^2`. `ckm`
/// must be the matrix of `par`.
pub fn prefactor(
    par: &ParameterStore,
    config: &PhysicsConfig,
    ckm: &CkmMatrix,
    transition: QuarkTransition,
    lepton: Lepton,
    q2: f64,
) -> Result<Complex64, FlvError> {
    let gf = par.get_positive("Gmu")?;
    let ml = par.get(&lepton.mass_parameter())?;
    let alpha_e = running::alpha_e(par, config.renormalization_scale.bvll)?;
    let (from, to) = transition.quarks();
    let xi_t = ckm.xi(UpQuark::T, from, to);
    if q2 <= 4.0 * ml * ml {
        return Ok(Complex64::default());
    }
    Ok(4.0 * gf / 2f64.sqrt() * xi_t * alpha_e / (4.0 * PI))
}

/// Short-distance helicity amplitudes from form factors and effective coefficients.
pub fn short_distance(
    q2: f64,
    m_b_meson: f64,
    m_v: f64,
    mb: f64,
    ff: &FormFactors,
    c: &EffectiveCoefficients,
    n: Complex64,
) -> Result<HelicityAmplitudes, FlvError> {
    let i = Complex64::new(0.0, 1.0);
    let sqrt_la = lambda_k(m_b_meson * m_b_meson, m_v * m_v, q2).max(0.0).sqrt();
    let m_sum = m_b_meson + m_v;
    let (v, a1, a12) = (ff.get(Ff::V)?, ff.get(Ff::A1)?, ff.get(Ff::A12)?);
    let (t1, t2, t23) = (ff.get(Ff::T1)?, ff.get(Ff::T2)?, ff.get(Ff::T23)?);

    let transverse = |sign: f64| {
        let vector = sign * (c.c9 + c.c9p) * sqrt_la * v / m_sum - (c.c9 - c.c9p) * m_sum * a1
            + 2.0 * mb / q2
                * (sign * (c.c7 + c.c7p) * sqrt_la * t1
                    - (c.c7 - c.c7p) * (m_b_meson * m_b_meson - m_v * m_v) * t2);
        let axial = sign * (c.c10 + c.c10p) * sqrt_la * v / m_sum - (c.c10 - c.c10p) * m_sum * a1;
        (i * n * vector, i * n * axial)
    };
    let (plus_v, plus_a) = transverse(1.0);
    let (minus_v, minus_a) = transverse(-1.0);

    let longitudinal = -i * n * 8.0 * m_b_meson * m_v / q2.sqrt();
    let zero_v = longitudinal * ((c.c9 - c.c9p) * a12 + mb * (c.c7 - c.c7p) * t23 / m_sum);
    let zero_a = longitudinal * (c.c10 - c.c10p) * a12;

    Ok(HelicityAmplitudes::default()
        .with(Helicity::Zero, Polarization::V, zero_v)
        .with(Helicity::Zero, Polarization::A, zero_a)
        .with(Helicity::Plus, Polarization::V, plus_v)
        .with(Helicity::Plus, Polarization::A, plus_a)
        .with(Helicity::Minus, Polarization::V, minus_v)
        .with(Helicity::Minus, Polarization::A, minus_a))
}

/// Full helicity amplitudes of `channel` at `q2`, optionally for the CP conjugate decay.
///
/// Conjugation is applied once, to the parameters and to the sector
/// coefficients, before effective coefficients are formed.
pub fn helicity_amplitudes(
    ctx: &EvalContext<'_>,
    wc: &WilsonCoefficients,
    par: &ParameterStore,
    channel: VectorChannel,
    lepton: Lepton,
    q2: f64,
    cp_conjugate: bool,
) -> Result<HelicityAmplitudes, FlvError> {
    let info = ctx.channels.get(channel)?;
    let scale = ctx.config.renormalization_scale.bvll;
    let sector = Sector::Dilepton(info.transition, lepton);

    let conjugated;
    let par = if cp_conjugate {
        conjugated = conjugate_parameters(par);
        &conjugated
    } else {
        par
    };
    let mut coefficients = wilson::total_coefficients(wc, sector, scale, par)?;
    if cp_conjugate {
        coefficients = conjugate_coefficients(&coefficients);
    }

    let ckm = ctx.derived.ckm(par)?;
    let n = prefactor(par, ctx.config, &ckm, info.transition, lepton, q2)?;
    let short = if n == Complex64::default() {
        HelicityAmplitudes::zero()
    } else {
        let ff = ctx
            .aux
            .evaluate(
                &info.family.auxiliary_name(),
                &AuxContext {
                    par,
                    wc: None,
                    q2,
                    config: ctx.config,
                    derived: &ctx.derived,
                },
            )?
            .into_form_factors()?;
        let eff = wilson::effective_coefficients(&coefficients, sector, q2, par)?;
        let m_b_meson = par.get_positive(&format!("m_{}", channel.initial().label()))?;
        let m_v = par.get_positive(&format!("m_{}", channel.vector().label()))?;
        let mb = running::m_b(par, scale)?;
        short_distance(q2, m_b_meson, m_v, mb, &ff, &eff, n)?
    };

    let spectator = if !lepton.is_light() || q2 >= SPECTATOR_SCATTERING_Q2_MAX {
        HelicityAmplitudes::zero()
    } else {
        ctx.aux
            .evaluate(
                &channel.spectator_name(lepton),
                &AuxContext {
                    par,
                    wc: Some(&coefficients),
                    q2,
                    config: ctx.config,
                    derived: &ctx.derived,
                },
            )?
            .into_helicity()?
    };

    let total = short.try_add(&spectator)?;
    total.ensure_finite()?;
    Ok(total)
}

/// Differential rate contributions (longitudinal, total) in GeV^-3 from one amplitude set.
fn rate_parts(
    amps: &HelicityAmplitudes,
    par: &ParameterStore,
    channel: VectorChannel,
    lepton: Lepton,
    q2: f64,
) -> Result<(f64, f64), FlvError> {
    let m_b_meson = par.get_positive(&format!("m_{}", channel.initial().label()))?;
    let m_v = par.get_positive(&format!("m_{}", channel.vector().label()))?;
    let ml = par.get(&lepton.mass_parameter())?;
    let beta = beta_l(ml, q2);
    if beta == 0.0 {
        return Ok((0.0, 0.0));
    }
    let sqrt_la = lambda_k(m_b_meson * m_b_meson, m_v * m_v, q2).max(0.0).sqrt();
    let norm = beta * sqrt_la * q2 / (96.0 * PI.powi(3) * m_b_meson.powi(3));
    let weight_v = 1.0 + 2.0 * ml * ml / q2;
    let weight_a = beta * beta;
    let mut longitudinal = 0.0;
    let mut total = 0.0;
    for ((helicity, polarization), value) in amps.iter() {
        let weight = match polarization {
            Polarization::V => weight_v,
            Polarization::A => weight_a,
        };
        let term = norm * weight * value.norm_sqr();
        total += term;
        if *helicity == Helicity::Zero {
            longitudinal += term;
        }
    }
    Ok((longitudinal, total))
}

/// CP-averaged rate parts summed over decay and conjugate decay.
fn cp_summed_parts(
    ctx: &EvalContext<'_>,
    wc: &WilsonCoefficients,
    par: &ParameterStore,
    channel: VectorChannel,
    lepton: Lepton,
    q2: f64,
) -> Result<(f64, f64), FlvError> {
    let amps = helicity_amplitudes(ctx, wc, par, channel, lepton, q2, false)?;
    let amps_bar = helicity_amplitudes(ctx, wc, par, channel, lepton, q2, true)?;
    let (l, t) = rate_parts(&amps, par, channel, lepton, q2)?;
    let (l_bar, t_bar) = rate_parts(&amps_bar, par, channel, lepton, q2)?;
    Ok((l + l_bar, t + t_bar))
}

/// CP-averaged differential branching ratio in GeV^-2.
pub fn dbr_dq2(
    ctx: &EvalContext<'_>,
    wc: &WilsonCoefficients,
    par: &ParameterStore,
    channel: VectorChannel,
    lepton: Lepton,
    q2: f64,
) -> Result<f64, FlvError> {
    let tau = par.get_positive(&format!("tau_{}", channel.initial().label()))?;
    let (_, total) = cp_summed_parts(ctx, wc, par, channel, lepton, q2)?;
    Ok(0.5 * total * lifetime_to_gev(tau))
}

/// Differential branching ratio averaged over `[q2min, q2max]`.
pub fn dbr_dq2_binned(
    ctx: &EvalContext<'_>,
    wc: &WilsonCoefficients,
    par: &ParameterStore,
    channel: VectorChannel,
    lepton: Lepton,
    q2min: f64,
    q2max: f64,
) -> Result<f64, FlvError> {
    if !(q2max > q2min) {
        return Err(domain_error(
            "q2-bin-empty",
            format!("q2 bin [{q2min}, {q2max}] is empty"),
        ));
    }
    let integral = simpson(
        |q2| dbr_dq2(ctx, wc, par, channel, lepton, q2),
        q2min,
        q2max,
        BIN_INTERVALS,
    )?;
    Ok(integral / (q2max - q2min))
}

/// Longitudinal polarisation fraction of the vector meson.
pub fn fl(
    ctx: &EvalContext<'_>,
    wc: &WilsonCoefficients,
    par: &ParameterStore,
    channel: VectorChannel,
    lepton: Lepton,
    q2: f64,
) -> Result<f64, FlvError> {
    let (longitudinal, total) = cp_summed_parts(ctx, wc, par, channel, lepton, q2)?;
    if total == 0.0 {
        return Err(domain_error(
            "fl-vanishing-rate",
            format!("FL undefined at q2 = {q2}: the rate vanishes"),
        ));
    }
    Ok(longitudinal / total)
}

/// Defines and binds the q2 observables of one channel and lepton.
pub fn register(
    observables: &mut ObservableRegistry,
    channel: VectorChannel,
    lepton: Lepton,
) -> Result<(), FlvError> {
    let process = channel.process(lepton);

    let name = format!("dBR/dq2({process})");
    observables.define(&name, format!("Differential branching ratio of {process}"), &["q2"])?;
    observables.attach_prediction(
        &name,
        prediction_fn(move |ctx, wc, par, args| {
            dbr_dq2(ctx, wc, par, channel, lepton, args[0]).map(PredictionValue::Real)
        }),
    )?;

    let name = format!("<dBR/dq2>({process})");
    observables.define(
        &name,
        format!("Binned differential branching ratio of {process}"),
        &["q2min", "q2max"],
    )?;
    observables.attach_prediction(
        &name,
        prediction_fn(move |ctx, wc, par, args| {
            dbr_dq2_binned(ctx, wc, par, channel, lepton, args[0], args[1])
                .map(PredictionValue::Real)
        }),
    )?;

    let name = format!("FL({process})");
    observables.define(
        &name,
        format!("Longitudinal polarisation fraction in {process}"),
        &["q2"],
    )?;
    observables.attach_prediction(
        &name,
        prediction_fn(move |ctx, wc, par, args| {
            fl(ctx, wc, par, channel, lepton, args[0]).map(PredictionValue::Real)
        }),
    )?;
    Ok(())
}
