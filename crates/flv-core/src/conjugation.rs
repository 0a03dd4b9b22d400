//! CP conjugation of parameters and coefficients.
//!
//! Both transforms are pure and involutive: applying either one twice returns
//! a value equal to the input, bit for bit. Amplitude code applies them to its
//! inputs exactly once, before any coefficient matching.

use crate::coefficients::WcSet;
use crate::parameters::{ParameterStore, ParameterValue};

/// CP-conjugated copy of `par`.
///
/// Real entries flagged CP-odd change sign, complex entries are conjugated,
/// everything else is copied unchanged.
pub fn conjugate_parameters(par: &ParameterStore) -> ParameterStore {
    par.map_values(|name, value| match value {
        ParameterValue::Real(x) if par.is_cp_odd(name) => ParameterValue::Real(-x),
        ParameterValue::Real(x) => ParameterValue::Real(x),
        ParameterValue::Complex(z) => ParameterValue::Complex(z.conj()),
    })
}

/// CP-conjugated copy of a coefficient set.
///
/// The weak phases of the CKM prefactors are handled by conjugating the
/// parameters; the coefficients themselves are complex conjugated.
pub fn conjugate_coefficients(wc: &WcSet) -> WcSet {
    wc.map_values(|_, value| value.conj())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use num_complex::Complex64;

    use super::*;

    #[test]
    fn only_cp_odd_reals_flip() {
        let values = BTreeMap::from([
            ("gamma".to_string(), ParameterValue::Real(1.2)),
            ("m_b".to_string(), ParameterValue::Real(4.18)),
            (
                "phase".to_string(),
                ParameterValue::Complex(Complex64::new(0.3, 0.4)),
            ),
        ]);
        let par = ParameterStore::from_values(values, BTreeSet::from(["gamma".to_string()]));
        let bar = conjugate_parameters(&par);
        assert_eq!(bar.get("gamma").unwrap(), -1.2);
        assert_eq!(bar.get("m_b").unwrap(), 4.18);
        assert_eq!(bar.get_complex("phase").unwrap(), Complex64::new(0.3, -0.4));
    }

    #[test]
    fn coefficients_are_conjugated() {
        let wc = WcSet::new(
            4.8,
            BTreeMap::from([("C9_bsmumu".to_string(), Complex64::new(4.2, 0.5))]),
        );
        let bar = conjugate_coefficients(&wc);
        assert_eq!(bar.get("C9_bsmumu").unwrap(), Complex64::new(4.2, -0.5));
        assert_eq!(bar.scale, 4.8);
    }
}
