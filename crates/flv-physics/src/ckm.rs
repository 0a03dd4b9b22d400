//! CKM matrix in the standard parametrisation built from tree-level inputs.

use std::f64::consts::PI;

use flv_core::{domain_error, numeric_error, Complex64, FlvError, ParameterStore};
use serde::{Deserialize, Serialize};

/// Up-type quark row index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UpQuark {
    /// up
    U,
    /// charm
    C,
    /// top
    T,
}

/// Down-type quark column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DownQuark {
    /// down
    D,
    /// strange
    S,
    /// bottom
    B,
}

impl UpQuark {
    fn row(self) -> usize {
        match self {
            UpQuark::U => 0,
            UpQuark::C => 1,
            UpQuark::T => 2,
        }
    }
}

impl DownQuark {
    fn column(self) -> usize {
        match self {
            DownQuark::D => 0,
            DownQuark::S => 1,
            DownQuark::B => 2,
        }
    }
}

const DELTA_MAX_ITERATIONS: usize = 64;
const DELTA_TOLERANCE: f64 = 1e-14;

/// Unitary 3x3 quark mixing matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CkmMatrix {
    elements: [[Complex64; 3]; 3],
}

impl CkmMatrix {
    /// Standard parametrisation from three mixing angles (as sines) and the phase `delta`.
    pub fn standard(s12: f64, s13: f64, s23: f64, delta: f64) -> Self {
        let c12 = (1.0 - s12 * s12).sqrt();
        let c13 = (1.0 - s13 * s13).sqrt();
        let c23 = (1.0 - s23 * s23).sqrt();
        let phase = Complex64::from_polar(1.0, delta);
        let re = |x: f64| Complex64::new(x, 0.0);
        let elements = [
            [re(c12 * c13), re(s12 * c13), s13 * phase.conj()],
            [
                re(-s12 * c23) - c12 * s23 * s13 * phase,
                re(c12 * c23) - s12 * s23 * s13 * phase,
                re(s23 * c13),
            ],
            [
                re(s12 * s23) - c12 * c23 * s13 * phase,
                re(-c12 * s23) - s12 * c23 * s13 * phase,
                re(c23 * c13),
            ],
        ];
        Self { elements }
    }

    /// Matrix from the tree-level inputs `|V_us|`, `|V_ub|`, `|V_cb|` and the angle gamma.
    pub fn from_tree(vus: f64, vub: f64, vcb: f64, gamma: f64) -> Result<Self, FlvError> {
        for (name, value) in [("Vus", vus), ("Vub", vub), ("Vcb", vcb)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(domain_error(
                    "ckm-element-range",
                    format!("{name} must lie in (0, 1), got {value}"),
                ));
            }
        }
        let c13 = (1.0 - vub * vub).sqrt();
        let s12 = vus / c13;
        let s23 = vcb / c13;
        if s12 >= 1.0 || s23 >= 1.0 {
            return Err(domain_error(
                "ckm-unitarity",
                "tree-level inputs violate unitarity",
            ));
        }
        let mut delta = gamma;
        for _ in 0..DELTA_MAX_ITERATIONS {
            let residual = wrap_angle(gamma - Self::standard(s12, vub, s23, delta).gamma());
            delta += residual;
            if residual.abs() < DELTA_TOLERANCE {
                return Ok(Self::standard(s12, vub, s23, delta));
            }
        }
        Err(numeric_error(
            "ckm-delta-convergence",
            format!("could not solve for the CKM phase at gamma = {gamma}"),
        ))
    }

    /// Matrix built from the `Vus`, `Vub`, `Vcb` and `gamma` parameters.
    pub fn from_parameters(par: &ParameterStore) -> Result<Self, FlvError> {
        Self::from_tree(
            par.get("Vus")?,
            par.get("Vub")?,
            par.get("Vcb")?,
            par.get("gamma")?,
        )
    }

    /// Element `V_{up, down}`.
    pub fn element(&self, up: UpQuark, down: DownQuark) -> Complex64 {
        self.elements[up.row()][down.column()]
    }

    /// `xi_q = V_{q i} V_{q j}^*` for the transition `i -> j`.
    pub fn xi(&self, up: UpQuark, from: DownQuark, to: DownQuark) -> Complex64 {
        self.element(up, from) * self.element(up, to).conj()
    }

    /// Unitarity triangle angle `gamma = arg(-V_ud V_ub^* / (V_cd V_cb^*))`.
    pub fn gamma(&self) -> f64 {
        let num = -self.xi(UpQuark::U, DownQuark::D, DownQuark::B);
        let den = self.xi(UpQuark::C, DownQuark::D, DownQuark::B);
        (num / den).arg()
    }

    /// Unitarity triangle angle `beta = arg(-V_cd V_cb^* / (V_td V_tb^*))`.
    pub fn beta(&self) -> f64 {
        let num = -self.xi(UpQuark::C, DownQuark::D, DownQuark::B);
        let den = self.xi(UpQuark::T, DownQuark::D, DownQuark::B);
        (num / den).arg()
    }
}

fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}
