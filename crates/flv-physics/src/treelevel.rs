//! Observables fixed by tree-level CKM inputs.

use std::f64::consts::PI;

use flv_core::{FlvError, ParameterStore};

use crate::ckm::{DownQuark, UpQuark};
use crate::common::lifetime_to_gev;
use crate::observables::{prediction_fn, EvalContext, ObservableRegistry, PredictionValue};

/// `BR(B+ -> tau+ nu)` in the Standard Model.
pub fn br_btaunu(ctx: &EvalContext<'_>, par: &ParameterStore) -> Result<f64, FlvError> {
    let gf = par.get_positive("Gmu")?;
    let m_b = par.get_positive("m_B+")?;
    let m_tau = par.get_positive("m_tau")?;
    let f_b = par.get_positive("f_B+")?;
    let tau = par.get_positive("tau_B+")?;
    let vub = ctx.derived.ckm(par)?.element(UpQuark::U, DownQuark::B).norm();
    let helicity = (1.0 - m_tau * m_tau / (m_b * m_b)).powi(2);
    let couplings = gf * gf * f_b * f_b * vub * vub;
    Ok(couplings * m_b * m_tau * m_tau * helicity * lifetime_to_gev(tau) / (8.0 * PI))
}

/// Defines and binds the tree-level observables.
pub fn register(observables: &mut ObservableRegistry) -> Result<(), FlvError> {
    let elements = [
        ("|V_us|", UpQuark::U, DownQuark::S),
        ("|V_cb|", UpQuark::C, DownQuark::B),
        ("|V_ub|", UpQuark::U, DownQuark::B),
    ];
    for (name, up, down) in elements {
        observables.define(name, format!("Modulus of the CKM element {name}"), &[])?;
        observables.attach_prediction(
            name,
            prediction_fn(move |ctx, _, par, _| {
                Ok(PredictionValue::Real(ctx.derived.ckm(par)?.element(up, down).norm()))
            }),
        )?;
    }
    observables.define("gamma", "CKM angle gamma", &[])?;
    observables.attach_prediction(
        "gamma",
        prediction_fn(|ctx, _, par, _| Ok(PredictionValue::Real(ctx.derived.ckm(par)?.gamma()))),
    )?;
    observables.define("BR(B+->taunu)", "Branching ratio of B+ -> tau+ nu", &[])?;
    observables.attach_prediction(
        "BR(B+->taunu)",
        prediction_fn(|ctx, _, par, _| br_btaunu(ctx, par).map(PredictionValue::Real)),
    )?;
    Ok(())
}
