//! Sector coefficient sets: new physics inputs, Standard Model values and
//! effective coefficients entering the amplitudes.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use flv_core::{Complex64, FlvError, ParameterStore, WcSet, WilsonCoefficients};

use crate::channels::{Lepton, Neutrino, QuarkTransition};
use crate::running;

/// LO Standard Model `C7eff` at the b-quark scale.
pub const C7_SM: f64 = -0.304;
/// LO Standard Model `C9` at the b-quark scale.
pub const C9_SM: f64 = 4.211;
/// LO Standard Model `C10`.
pub const C10_SM: f64 = -4.103;
/// Current-current coefficients at the b-quark scale.
const C1_SM: f64 = -0.29;
const C2_SM: f64 = 1.01;

/// A set of coefficients that are matched and run together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sector {
    /// `d_i -> d_j l+ l-`.
    Dilepton(QuarkTransition, Lepton),
    /// `d_i -> d_j nu nubar` with possibly different neutrino flavours.
    Dineutrino(QuarkTransition, Neutrino, Neutrino),
}

impl Sector {
    /// Label such as `bsmumu` or `sdnuenutau`.
    pub fn label(self) -> String {
        match self {
            Sector::Dilepton(q, l) => format!("{}{}{}", q.label(), l.label(), l.label()),
            Sector::Dineutrino(q, n1, n2) => format!("{}{}{}", q.label(), n1.label(), n2.label()),
        }
    }

    /// Coefficient names of the sector.
    pub fn coefficient_names(self) -> Vec<String> {
        match self {
            Sector::Dilepton(q, _) => {
                let label = self.label();
                vec![
                    format!("C7eff_{}", q.label()),
                    format!("C7effp_{}", q.label()),
                    format!("C9_{label}"),
                    format!("C9p_{label}"),
                    format!("C10_{label}"),
                    format!("C10p_{label}"),
                ]
            }
            Sector::Dineutrino(..) => {
                let label = self.label();
                vec![format!("CL_{label}"), format!("CR_{label}")]
            }
        }
    }
}

/// New physics part of the sector coefficients at `scale`.
///
/// Dipole coefficients are evolved at LO from the input scale; semileptonic
/// coefficients do not run at this order.
pub fn coefficients_for(
    wc: &WilsonCoefficients,
    sector: Sector,
    scale: f64,
    par: &ParameterStore,
) -> Result<WcSet, FlvError> {
    let dipole = match sector {
        Sector::Dilepton(..) => running::dipole_evolution(par, wc.scale(), scale)?,
        Sector::Dineutrino(..) => 1.0,
    };
    let values: BTreeMap<String, Complex64> = sector
        .coefficient_names()
        .into_iter()
        .map(|name| {
            let value = wc.get(&name);
            let value = if name.starts_with("C7") { value * dipole } else { value };
            (name, value)
        })
        .collect();
    Ok(WcSet::new(scale, values))
}

/// Standard Model plus new physics coefficients of `sector` at `scale`.
pub fn total_coefficients(
    wc: &WilsonCoefficients,
    sector: Sector,
    scale: f64,
    par: &ParameterStore,
) -> Result<WcSet, FlvError> {
    let mut set = coefficients_for(wc, sector, scale, par)?;
    match sector {
        Sector::Dilepton(q, _) => {
            let label = sector.label();
            set.add(&format!("C7eff_{}", q.label()), Complex64::new(C7_SM, 0.0));
            set.add(&format!("C9_{label}"), Complex64::new(C9_SM, 0.0));
            set.add(&format!("C10_{label}"), Complex64::new(C10_SM, 0.0));
        }
        Sector::Dineutrino(_, n1, n2) => {
            if n1 == n2 {
                let label = sector.label();
                set.add(&format!("CL_{label}"), Complex64::new(cl_sm(par)?, 0.0));
            }
        }
    }
    Ok(set)
}

/// Standard Model `C_L` of `s -> d nu nubar` from the top loop function `X_t`.
pub fn cl_sm(par: &ParameterStore) -> Result<f64, FlvError> {
    let s2w = par.get_positive("s2w")?;
    let mt = par.get_positive("m_t")?;
    let shift = mt / 165.0 - 1.0;
    let xt = 1.50546 * (1.0 + 1.14064 * shift) + 1.50546 * (-0.031435 - 0.139303 * shift);
    Ok(-xt / s2w)
}

/// LO charm loop function `h(q2, m)` at scale `mu`.
pub fn charm_loop(q2: f64, m: f64, mu: f64) -> Complex64 {
    let z = 4.0 * m * m / q2;
    let log_term = (m * m / (mu * mu)).ln() - 2.0 / 3.0 - z;
    let root = (z - 1.0).abs().sqrt();
    let branch = if z > 1.0 {
        Complex64::new((1.0 / root).atan(), 0.0)
    } else {
        Complex64::new(((1.0 + root) / z.sqrt()).ln(), -PI / 2.0)
    };
    Complex64::new(-4.0 / 9.0 * log_term, 0.0) - 4.0 / 9.0 * (2.0 + z) * root * branch
}

/// Effective coefficients for `b -> s l+ l-` amplitudes at `q2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveCoefficients {
    /// `C7eff`
    pub c7: Complex64,
    /// `C7eff'`
    pub c7p: Complex64,
    /// `C9eff` including the charm loop
    pub c9: Complex64,
    /// `C9eff'`
    pub c9p: Complex64,
    /// `C10`
    pub c10: Complex64,
    /// `C10'`
    pub c10p: Complex64,
}

/// Effective coefficients of a dilepton sector at `q2`.
pub fn effective_coefficients(
    wc: &WcSet,
    sector: Sector,
    q2: f64,
    par: &ParameterStore,
) -> Result<EffectiveCoefficients, FlvError> {
    let names = sector.coefficient_names();
    let [c7, c7p, c9, c9p, c10, c10p] = match names.as_slice() {
        [a, b, c, d, e, f] => [
            wc.get(a)?,
            wc.get(b)?,
            wc.get(c)?,
            wc.get(d)?,
            wc.get(e)?,
            wc.get(f)?,
        ],
        _ => {
            return Err(flv_core::config_error(
                "sector-not-dilepton",
                format!("sector {} has no dipole coefficients", sector.label()),
            ))
        }
    };
    let m_c = running::m_c(par, wc.scale)?;
    let charm = (4.0 / 3.0 * C1_SM + C2_SM) * charm_loop(q2, m_c, wc.scale);
    Ok(EffectiveCoefficients {
        c7,
        c7p,
        c9: c9 + charm,
        c9p,
        c10,
        c10p,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_labels_follow_naming() {
        let s = Sector::Dilepton(QuarkTransition::Bs, Lepton::Mu);
        assert_eq!(s.label(), "bsmumu");
        assert!(s.coefficient_names().contains(&"C9_bsmumu".to_string()));
        let n = Sector::Dineutrino(QuarkTransition::Sd, Neutrino::NuE, Neutrino::NuTau);
        assert_eq!(n.coefficient_names(), vec!["CL_sdnuenutau", "CR_sdnuenutau"]);
    }

    #[test]
    fn charm_loop_is_finite_on_both_sides_of_threshold() {
        for q2 in [1.0, 6.0, 12.0] {
            let h = charm_loop(q2, 1.3, 4.8);
            assert!(h.re.is_finite() && h.im.is_finite());
        }
        assert_eq!(charm_loop(1.0, 1.3, 4.8).im, 0.0);
        assert!(charm_loop(12.0, 1.3, 4.8).im != 0.0);
    }
}
