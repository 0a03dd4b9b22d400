//! Pole times z-expansion form factors for B -> V transitions.

use std::collections::BTreeMap;

use flv_core::{domain_error, ErrorInfo, FlvError, ParameterStore};
use serde::{Deserialize, Serialize};

use crate::auxiliary::{AuxContext, AuxValue, AuxiliaryProvider};
use crate::channels::{FormFactorFamily, Meson};

/// B -> V form factor components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormFactorComponent {
    /// vector
    V,
    /// timelike axial
    A0,
    /// axial
    A1,
    /// longitudinal axial combination
    A12,
    /// transverse tensor
    T1,
    /// transverse tensor
    T2,
    /// longitudinal tensor combination
    T23,
}

impl FormFactorComponent {
    /// All components.
    pub const ALL: [FormFactorComponent; 7] = [
        FormFactorComponent::V,
        FormFactorComponent::A0,
        FormFactorComponent::A1,
        FormFactorComponent::A12,
        FormFactorComponent::T1,
        FormFactorComponent::T2,
        FormFactorComponent::T23,
    ];

    /// Label used in parameter names.
    pub fn label(self) -> &'static str {
        match self {
            FormFactorComponent::V => "V",
            FormFactorComponent::A0 => "A0",
            FormFactorComponent::A1 => "A1",
            FormFactorComponent::A12 => "A12",
            FormFactorComponent::T1 => "T1",
            FormFactorComponent::T2 => "T2",
            FormFactorComponent::T23 => "T23",
        }
    }

    /// Mass of the lowest b-sbar resonance with matching quantum numbers, in GeV.
    pub fn resonance_mass(self) -> f64 {
        match self {
            FormFactorComponent::V | FormFactorComponent::T1 => 5.415,
            FormFactorComponent::A0 => 5.366,
            FormFactorComponent::A1
            | FormFactorComponent::A12
            | FormFactorComponent::T2
            | FormFactorComponent::T23 => 5.829,
        }
    }
}

/// Values of all components at one `q2`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormFactors {
    values: BTreeMap<FormFactorComponent, f64>,
}

impl FormFactors {
    /// Value of `component`.
    pub fn get(&self, component: FormFactorComponent) -> Result<f64, FlvError> {
        self.values.get(&component).copied().ok_or_else(|| {
            FlvError::Configuration(
                ErrorInfo::new("form-factor-missing", "form factor component not provided")
                    .with_context("component", component.label()),
            )
        })
    }

    /// Sets `component`.
    pub fn insert(&mut self, component: FormFactorComponent, value: f64) {
        self.values.insert(component, value);
    }
}

/// Parameter name of the z-expansion coefficient `order` of `component`.
pub fn coefficient_name(
    family: FormFactorFamily,
    component: FormFactorComponent,
    order: usize,
) -> String {
    format!("{} BSZ a{order}_{}", family.label(), component.label())
}

/// Initial and final meson whose masses fix the kinematics of `family`.
pub fn family_mesons(family: FormFactorFamily) -> (Meson, Meson) {
    match family {
        FormFactorFamily::BToKStar => (Meson::B0, Meson::KStar0),
        FormFactorFamily::BsToPhi => (Meson::Bs, Meson::Phi),
    }
}

fn z_variable(q2: f64, t_plus: f64, t0: f64) -> f64 {
    let a = (t_plus - q2).sqrt();
    let b = (t_plus - t0).sqrt();
    (a - b) / (a + b)
}

/// Evaluates every component of `family` at `q2`.
pub fn evaluate(
    family: FormFactorFamily,
    par: &ParameterStore,
    q2: f64,
) -> Result<FormFactors, FlvError> {
    let (initial, vector) = family_mesons(family);
    let m_b = par.get_positive(&format!("m_{}", initial.label()))?;
    let m_v = par.get_positive(&format!("m_{}", vector.label()))?;
    let t_plus = (m_b + m_v).powi(2);
    let t_minus = (m_b - m_v).powi(2);
    if !(q2 < t_minus) {
        return Err(domain_error(
            "form-factor-q2-range",
            format!("q2 = {q2} outside the physical region of {}", family.label()),
        ));
    }
    let t0 = t_plus * (1.0 - (1.0 - t_minus / t_plus).sqrt());
    let dz = z_variable(q2, t_plus, t0) - z_variable(0.0, t_plus, t0);
    let mut ff = FormFactors::default();
    for component in FormFactorComponent::ALL {
        let a0 = par.get(&coefficient_name(family, component, 0))?;
        let a1 = par.get(&coefficient_name(family, component, 1))?;
        let pole = 1.0 / (1.0 - q2 / component.resonance_mass().powi(2));
        ff.insert(component, pole * (a0 + a1 * dz));
    }
    Ok(ff)
}

/// Provider of the `"<family> form factor"` auxiliary quantity.
#[derive(Debug, Clone, Copy)]
pub struct FormFactorProvider {
    /// Parametrised family.
    pub family: FormFactorFamily,
}

impl AuxiliaryProvider for FormFactorProvider {
    fn evaluate(&self, ctx: &AuxContext<'_>) -> Result<AuxValue, FlvError> {
        evaluate(self.family, ctx.par, ctx.q2).map(AuxValue::FormFactors)
    }
}
