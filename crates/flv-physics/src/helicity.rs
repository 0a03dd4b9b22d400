//! Helicity amplitude sets keyed by (helicity, polarisation).

use std::collections::BTreeMap;
use std::fmt;

use flv_core::{numeric_error, Complex64, ErrorInfo, FlvError};
use serde::{Deserialize, Serialize};

/// Helicity of the vector meson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Helicity {
    /// longitudinal, label `0`
    Zero,
    /// positive, label `pl`
    Plus,
    /// negative, label `mi`
    Minus,
}

/// Lepton current polarisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Polarization {
    /// vector current
    V,
    /// axial current
    A,
}

impl Helicity {
    /// All helicities.
    pub const ALL: [Helicity; 3] = [Helicity::Zero, Helicity::Plus, Helicity::Minus];

    /// Short label.
    pub fn label(self) -> &'static str {
        match self {
            Helicity::Zero => "0",
            Helicity::Plus => "pl",
            Helicity::Minus => "mi",
        }
    }
}

impl Polarization {
    /// Both polarisations.
    pub const ALL: [Polarization; 2] = [Polarization::V, Polarization::A];
}

impl fmt::Display for Helicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Amplitude key.
pub type HelicityKey = (Helicity, Polarization);

/// Complex amplitudes for one kinematic point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HelicityAmplitudes {
    values: BTreeMap<HelicityKey, Complex64>,
}

impl HelicityAmplitudes {
    /// Amplitude set with every (helicity, polarisation) key set to zero.
    pub fn zero() -> Self {
        let values = Helicity::ALL
            .iter()
            .flat_map(|&h| Polarization::ALL.iter().map(move |&p| ((h, p), Complex64::default())))
            .collect();
        Self { values }
    }

    /// Sets one entry.
    pub fn insert(&mut self, helicity: Helicity, polarization: Polarization, value: Complex64) {
        self.values.insert((helicity, polarization), value);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(
        mut self,
        helicity: Helicity,
        polarization: Polarization,
        value: Complex64,
    ) -> Self {
        self.insert(helicity, polarization, value);
        self
    }

    /// Entry for a key, if present.
    pub fn get(&self, helicity: Helicity, polarization: Polarization) -> Option<Complex64> {
        self.values.get(&(helicity, polarization)).copied()
    }

    /// Present keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &HelicityKey> {
        self.values.keys()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&HelicityKey, &Complex64)> {
        self.values.iter()
    }

    /// Whether every entry is zero.
    pub fn is_zero(&self) -> bool {
        self.values.values().all(|z| z.re == 0.0 && z.im == 0.0)
    }

    /// Element-wise sum; the key sets must be identical.
    pub fn try_add(&self, other: &Self) -> Result<Self, FlvError> {
        if !self.values.keys().eq(other.values.keys()) {
            let describe = |amps: &Self| {
                amps.values
                    .keys()
                    .map(|(h, p)| format!("({h},{p:?})"))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            return Err(FlvError::Configuration(
                ErrorInfo::new("helicity-keys-mismatch", "helicity amplitude keys differ")
                    .with_context("left", describe(self))
                    .with_context("right", describe(other)),
            ));
        }
        let values = self
            .values
            .iter()
            .zip(other.values.values())
            .map(|((key, a), b)| (*key, a + b))
            .collect();
        Ok(Self { values })
    }

    /// Fails with a numeric error when any entry is not finite.
    pub fn ensure_finite(&self) -> Result<(), FlvError> {
        match self.values.iter().find(|(_, z)| !(z.re.is_finite() && z.im.is_finite())) {
            Some(((h, p), z)) => Err(numeric_error(
                "helicity-not-finite",
                format!("amplitude ({h},{p:?}) is {z}"),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_has_all_six_keys() {
        let zero = HelicityAmplitudes::zero();
        assert_eq!(zero.keys().count(), 6);
        assert!(zero.is_zero());
    }

    #[test]
    fn mismatched_keys_fail_instead_of_dropping() {
        let one = Complex64::new(1.0, 0.0);
        let partial = HelicityAmplitudes::default().with(Helicity::Zero, Polarization::V, one);
        let err = HelicityAmplitudes::zero().try_add(&partial).unwrap_err();
        assert!(matches!(err, FlvError::Configuration(_)));
    }

    #[test]
    fn sum_is_element_wise() {
        let a = HelicityAmplitudes::zero()
            .with(Helicity::Plus, Polarization::A, Complex64::new(1.0, 2.0));
        let b = HelicityAmplitudes::zero()
            .with(Helicity::Plus, Polarization::A, Complex64::new(0.5, -1.0));
        let sum = a.try_add(&b).unwrap();
        assert_eq!(sum.get(Helicity::Plus, Polarization::A), Some(Complex64::new(1.5, 1.0)));
    }
}
