//! Named providers of derived quantities (form factors, long-distance corrections).
//!
//! Providers are registered while a catalogue is being built and are read-only
//! afterwards. A provider must be a pure function of its [`AuxContext`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use flv_core::{Complex64, ErrorInfo, FlvError, ParameterStore, PhysicsConfig, WcSet};
use log::warn;

use crate::derived::DerivedCache;
use crate::formfactors::FormFactors;
use crate::helicity::HelicityAmplitudes;

/// Inputs handed to a provider.
#[derive(Debug, Clone, Copy)]
pub struct AuxContext<'a> {
    /// Parameters, already CP conjugated when the caller requested it.
    pub par: &'a ParameterStore,
    /// Sector coefficients, absent for pure hadronic quantities.
    pub wc: Option<&'a WcSet>,
    /// Squared momentum transfer in GeV^2.
    pub q2: f64,
    /// Renormalisation scales.
    pub config: &'a PhysicsConfig,
    /// Memo of the enclosing evaluation.
    pub derived: &'a DerivedCache,
}

/// Value produced by a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum AuxValue {
    /// Real scalar.
    Real(f64),
    /// Complex scalar.
    Complex(Complex64),
    /// Set of form factor components.
    FormFactors(FormFactors),
    /// Helicity amplitude corrections.
    Helicity(HelicityAmplitudes),
}

impl AuxValue {
    fn kind(&self) -> &'static str {
        match self {
            AuxValue::Real(_) => "real",
            AuxValue::Complex(_) => "complex",
            AuxValue::FormFactors(_) => "form factors",
            AuxValue::Helicity(_) => "helicity amplitudes",
        }
    }

    /// Unwraps form factors, failing on any other kind.
    pub fn into_form_factors(self) -> Result<FormFactors, FlvError> {
        match self {
            AuxValue::FormFactors(ff) => Ok(ff),
            other => Err(type_mismatch("form factors", other.kind())),
        }
    }

    /// Unwraps helicity amplitudes, failing on any other kind.
    pub fn into_helicity(self) -> Result<HelicityAmplitudes, FlvError> {
        match self {
            AuxValue::Helicity(amps) => Ok(amps),
            other => Err(type_mismatch("helicity amplitudes", other.kind())),
        }
    }

    /// Complex view of scalar values.
    pub fn to_complex(&self) -> Result<Complex64, FlvError> {
        match self {
            AuxValue::Real(x) => Ok(Complex64::new(*x, 0.0)),
            AuxValue::Complex(z) => Ok(*z),
            other => Err(type_mismatch("scalar", other.kind())),
        }
    }
}

fn type_mismatch(expected: &str, found: &str) -> FlvError {
    FlvError::Configuration(
        ErrorInfo::new("auxiliary-type-mismatch", "auxiliary quantity has the wrong kind")
            .with_context("expected", expected)
            .with_context("found", found),
    )
}

/// Computes one auxiliary quantity.
pub trait AuxiliaryProvider: Send + Sync {
    /// Evaluates the quantity.
    fn evaluate(&self, ctx: &AuxContext<'_>) -> Result<AuxValue, FlvError>;
}

impl<F> AuxiliaryProvider for F
where
    F: Fn(&AuxContext<'_>) -> Result<AuxValue, FlvError> + Send + Sync,
{
    fn evaluate(&self, ctx: &AuxContext<'_>) -> Result<AuxValue, FlvError> {
        self(ctx)
    }
}

/// Pins a closure to the provider signature so its argument lifetimes are inferred.
pub fn provider_fn<F>(f: F) -> F
where
    F: Fn(&AuxContext<'_>) -> Result<AuxValue, FlvError> + Send + Sync,
{
    f
}

/// Registry of auxiliary quantities keyed by name.
#[derive(Clone, Default)]
pub struct AuxiliaryRegistry {
    providers: BTreeMap<String, Arc<dyn AuxiliaryProvider>>,
}

impl fmt::Debug for AuxiliaryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuxiliaryRegistry")
            .field("names", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AuxiliaryRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider; an existing name is a configuration error.
    pub fn register<P>(&mut self, name: impl Into<String>, provider: P) -> Result<(), FlvError>
    where
        P: AuxiliaryProvider + 'static,
    {
        let name = name.into();
        if self.providers.contains_key(&name) {
            return Err(FlvError::Configuration(
                ErrorInfo::new("auxiliary-duplicate", "auxiliary quantity already registered")
                    .with_context("name", name)
                    .with_hint("use register_or_replace to shadow a provider explicitly"),
            ));
        }
        self.providers.insert(name, Arc::new(provider));
        Ok(())
    }

    /// Registers a provider, replacing any existing one. Returns whether a provider was replaced.
    pub fn register_or_replace<P>(&mut self, name: impl Into<String>, provider: P) -> bool
    where
        P: AuxiliaryProvider + 'static,
    {
        let name = name.into();
        let replaced = self.providers.insert(name.clone(), Arc::new(provider)).is_some();
        if replaced {
            warn!("replacing provider of auxiliary quantity `{name}`");
        }
        replaced
    }

    /// Provider registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<&dyn AuxiliaryProvider, FlvError> {
        self.providers
            .get(name)
            .map(|provider| provider.as_ref())
            .ok_or_else(|| {
                FlvError::MissingAuxiliary(
                    ErrorInfo::new("auxiliary-not-found", "no provider for auxiliary quantity")
                        .with_context("name", name),
                )
            })
    }

    /// Resolves `name` and evaluates it.
    pub fn evaluate(&self, name: &str, ctx: &AuxContext<'_>) -> Result<AuxValue, FlvError> {
        self.resolve(name)?.evaluate(ctx)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}
