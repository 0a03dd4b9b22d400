//! Wilson coefficients: the user-facing coefficient object and per-sector sets.

use std::collections::BTreeMap;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, FlvError};

/// New-physics contributions to Wilson coefficients at an input scale.
///
/// Coefficients that are not set are zero, i.e. the Standard Model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WilsonCoefficients {
    scale: f64,
    values: BTreeMap<String, Complex64>,
}

impl Default for WilsonCoefficients {
    fn default() -> Self {
        Self::new(160.0)
    }
}

impl WilsonCoefficients {
    /// Empty (Standard Model) coefficients defined at `scale` in GeV.
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, name: impl Into<String>, value: Complex64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Sets or replaces a coefficient.
    pub fn set(&mut self, name: impl Into<String>, value: Complex64) {
        self.values.insert(name.into(), value);
    }

    /// Input scale in GeV.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Value of `name`, zero when unset.
    pub fn get(&self, name: &str) -> Complex64 {
        self.values.get(name).copied().unwrap_or_default()
    }

    /// Iterates over the explicitly set coefficients.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Complex64)> {
        self.values.iter()
    }
}

/// Coefficients of one sector (e.g. `bsmumu`) at a fixed renormalisation scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WcSet {
    /// Renormalisation scale in GeV.
    pub scale: f64,
    values: BTreeMap<String, Complex64>,
}

impl WcSet {
    /// Builds a set from explicit values.
    pub fn new(scale: f64, values: BTreeMap<String, Complex64>) -> Self {
        Self { scale, values }
    }

    /// Value of `name`; absent names are a catalogue bug.
    pub fn get(&self, name: &str) -> Result<Complex64, FlvError> {
        self.values.get(name).copied().ok_or_else(|| {
            FlvError::Configuration(
                ErrorInfo::new("coefficient-missing", "coefficient not in sector set")
                    .with_context("coefficient", name)
                    .with_context("available", self.names().join(",")),
            )
        })
    }

    /// Adds `delta` to `name`, inserting it when absent.
    pub fn add(&mut self, name: &str, delta: Complex64) {
        *self.values.entry(name.to_string()).or_default() += delta;
    }

    /// Sets `name` to `value`.
    pub fn insert(&mut self, name: impl Into<String>, value: Complex64) {
        self.values.insert(name.into(), value);
    }

    /// Coefficient names in order.
    pub fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Iterates over names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Complex64)> {
        self.values.iter()
    }

    /// Structural copy with every value transformed by `f`.
    pub fn map_values<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, Complex64) -> Complex64,
    {
        Self {
            scale: self.scale,
            values: self
                .values
                .iter()
                .map(|(name, value)| (name.clone(), f(name, *value)))
                .collect(),
        }
    }
}
