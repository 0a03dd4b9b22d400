//! Parameter schema and the per-evaluation parameter store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::distributions::{Distribution, Support};
use crate::errors::{domain_error, ErrorInfo, FlvError};

/// Value of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Real-valued parameter (the common case).
    Real(f64),
    /// Complex-valued parameter.
    Complex(Complex64),
}

impl ParameterValue {
    /// Returns the value as a complex number.
    pub fn to_complex(self) -> Complex64 {
        match self {
            ParameterValue::Real(x) => Complex64::new(x, 0.0),
            ParameterValue::Complex(z) => z,
        }
    }
}

/// Static description of a parameter: support, uncertainty and CP behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Unique parameter name, e.g. `m_B0` or `bag_B0_1`.
    pub name: String,
    /// Default (central) value.
    pub value: ParameterValue,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Physical support; values outside are rejected with a domain error.
    #[serde(default)]
    pub support: Support,
    /// Uncertainty used as prior when the parameter is a nuisance parameter.
    #[serde(default)]
    pub uncertainty: Option<Distribution>,
    /// Sign of a CP-odd phase flips under CP conjugation.
    #[serde(default)]
    pub cp_odd: bool,
}

impl ParameterSpec {
    /// Real parameter with real support and no uncertainty.
    pub fn real(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::Real(value),
            description: String::new(),
            support: Support::Real,
            uncertainty: None,
            cp_odd: false,
        }
    }

    /// Sets the support.
    pub fn with_support(mut self, support: Support) -> Self {
        self.support = support;
        self
    }

    /// Attaches a Gaussian uncertainty centred on the default value.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        let central = self.value.to_complex().re;
        self.uncertainty = Some(Distribution::normal(central, sigma));
        self
    }

    /// Attaches an arbitrary uncertainty distribution.
    pub fn with_uncertainty(mut self, uncertainty: Distribution) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    /// Marks the parameter as a CP-odd phase.
    pub fn cp_odd(mut self) -> Self {
        self.cp_odd = true;
        self
    }

    /// Sets the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Catalogue of all known parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    specs: BTreeMap<String, ParameterSpec>,
}

impl ParameterSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter; duplicate names are rejected.
    pub fn insert(&mut self, spec: ParameterSpec) -> Result<(), FlvError> {
        if self.specs.contains_key(&spec.name) {
            return Err(FlvError::Configuration(
                ErrorInfo::new("parameter-duplicate", "parameter already declared")
                    .with_context("parameter", spec.name.clone()),
            ));
        }
        if let Some(uncertainty) = &spec.uncertainty {
            uncertainty.validate()?;
        }
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Replaces or adds a parameter.
    pub fn upsert(&mut self, spec: ParameterSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    /// Looks up a parameter description.
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.get(name)
    }

    /// Like [`ParameterSchema::get`] but fails with a configuration error.
    pub fn require(&self, name: &str) -> Result<&ParameterSpec, FlvError> {
        self.specs.get(name).ok_or_else(|| missing_parameter(name))
    }

    /// Whether `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Iterates over declared parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.specs.values()
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether no parameter is declared.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Builds the store of default values.
    pub fn default_store(&self) -> ParameterStore {
        let values = self
            .specs
            .values()
            .map(|spec| (spec.name.clone(), spec.value))
            .collect();
        let cp_odd = self
            .specs
            .values()
            .filter(|spec| spec.cp_odd)
            .map(|spec| spec.name.clone())
            .collect();
        ParameterStore {
            values,
            cp_odd: Arc::new(cp_odd),
        }
    }

    /// Checks `value` against the declared support of `name`.
    pub fn check_support(&self, name: &str, value: f64) -> Result<(), FlvError> {
        let spec = self.require(name)?;
        if spec.support.contains(value) {
            Ok(())
        } else {
            Err(FlvError::Domain(
                ErrorInfo::new("parameter-out-of-support", "parameter outside its support")
                    .with_context("parameter", name)
                    .with_context("value", value.to_string()),
            ))
        }
    }
}

/// Immutable mapping from parameter names to values for one evaluation.
///
/// Overrides and CP conjugation produce structural copies; a store is never
/// modified while a prediction is running.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    values: BTreeMap<String, ParameterValue>,
    cp_odd: Arc<BTreeSet<String>>,
}

impl ParameterStore {
    /// Builds a store from explicit values; `cp_odd` lists the CP-odd phases.
    pub fn from_values(
        values: BTreeMap<String, ParameterValue>,
        cp_odd: BTreeSet<String>,
    ) -> Self {
        Self {
            values,
            cp_odd: Arc::new(cp_odd),
        }
    }

    /// Real value of `name`.
    pub fn get(&self, name: &str) -> Result<f64, FlvError> {
        match self.value(name)? {
            ParameterValue::Real(x) => Ok(*x),
            ParameterValue::Complex(_) => Err(FlvError::Configuration(
                ErrorInfo::new("parameter-not-real", "complex parameter used as real")
                    .with_context("parameter", name),
            )),
        }
    }

    /// Real value of `name`, required strictly positive.
    pub fn get_positive(&self, name: &str) -> Result<f64, FlvError> {
        let value = self.get(name)?;
        if value > 0.0 && value.is_finite() {
            Ok(value)
        } else {
            Err(domain_error(
                "parameter-not-positive",
                format!("parameter {name} must be positive, got {value}"),
            ))
        }
    }

    /// Complex value of `name`; real parameters are promoted.
    pub fn get_complex(&self, name: &str) -> Result<Complex64, FlvError> {
        Ok(self.value(name)?.to_complex())
    }

    /// Raw value of `name`.
    pub fn value(&self, name: &str) -> Result<&ParameterValue, FlvError> {
        self.values.get(name).ok_or_else(|| missing_parameter(name))
    }

    /// Whether `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates over names and values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.values.iter()
    }

    /// Whether `name` is flagged as a CP-odd phase.
    pub fn is_cp_odd(&self, name: &str) -> bool {
        self.cp_odd.contains(name)
    }

    /// Structural copy with real overrides applied; unknown names are rejected.
    pub fn with_overrides<'a, I>(&self, overrides: I) -> Result<Self, FlvError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut copy = self.clone();
        for (name, value) in overrides {
            let slot = copy
                .values
                .get_mut(name)
                .ok_or_else(|| missing_parameter(name))?;
            *slot = ParameterValue::Real(value);
        }
        Ok(copy)
    }

    /// Structural copy with every entry transformed by `f`.
    pub fn map_values<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, ParameterValue) -> ParameterValue,
    {
        let values = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), f(name, *value)))
            .collect();
        Self {
            values,
            cp_odd: Arc::clone(&self.cp_odd),
        }
    }
}

fn missing_parameter(name: &str) -> FlvError {
    FlvError::Configuration(
        ErrorInfo::new("parameter-missing", "parameter is not present in the store")
            .with_context("parameter", name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ParameterSchema {
        let mut schema = ParameterSchema::new();
        schema
            .insert(ParameterSpec::real("m_b", 4.18).with_support(Support::Positive))
            .unwrap();
        schema
            .insert(ParameterSpec::real("gamma", 1.2).cp_odd())
            .unwrap();
        schema
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let mut schema = schema();
        let err = schema.insert(ParameterSpec::real("m_b", 4.0)).unwrap_err();
        assert!(matches!(err, FlvError::Configuration(_)));
        assert_eq!(err.info().code, "parameter-duplicate");
    }

    #[test]
    fn overrides_copy_instead_of_mutating() {
        let store = schema().default_store();
        let copy = store.with_overrides([("m_b", 4.5)]).unwrap();
        assert_eq!(store.get("m_b").unwrap(), 4.18);
        assert_eq!(copy.get("m_b").unwrap(), 4.5);
        assert!(copy.is_cp_odd("gamma"));
    }

    #[test]
    fn unknown_override_is_a_configuration_error() {
        let store = schema().default_store();
        let err = store.with_overrides([("m_x", 1.0)]).unwrap_err();
        assert_eq!(err.info().code, "parameter-missing");
    }

    #[test]
    fn support_violation_is_a_domain_error() {
        let err = schema().check_support("m_b", -1.0).unwrap_err();
        assert!(!err.is_fatal());
    }
}
