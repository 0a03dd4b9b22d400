//! Observable registry: named observables bound to prediction functions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use flv_core::{
    Complex64, ErrorInfo, FlvError, ParameterStore, PhysicsConfig, WilsonCoefficients,
};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::auxiliary::AuxiliaryRegistry;
use crate::channels::ChannelTable;
use crate::derived::DerivedCache;

/// Catalogue state handed to every prediction, plus the memo of one evaluation.
#[derive(Debug)]
pub struct EvalContext<'a> {
    /// Auxiliary quantities.
    pub aux: &'a AuxiliaryRegistry,
    /// Channel properties.
    pub channels: &'a ChannelTable,
    /// Renormalisation scales.
    pub config: &'a PhysicsConfig,
    /// Quantities derived from the parameters, shared by every call within this evaluation.
    pub derived: DerivedCache,
}

/// Value returned by a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionValue {
    /// Real prediction (the common case).
    Real(f64),
    /// Complex prediction.
    Complex(Complex64),
}

impl PredictionValue {
    /// Real value; complex predictions cannot be compared with measurements.
    pub fn as_real(self) -> Result<f64, FlvError> {
        match self {
            PredictionValue::Real(x) => Ok(x),
            PredictionValue::Complex(z) => Err(FlvError::Configuration(
                ErrorInfo::new("prediction-not-real", "complex prediction used as real")
                    .with_context("value", z.to_string()),
            )),
        }
    }
}

impl From<f64> for PredictionValue {
    fn from(value: f64) -> Self {
        PredictionValue::Real(value)
    }
}

/// Computes an observable from coefficients, parameters and kinematic arguments.
pub trait Prediction: Send + Sync {
    /// Evaluates the prediction.
    fn predict(
        &self,
        ctx: &EvalContext<'_>,
        wc: &WilsonCoefficients,
        par: &ParameterStore,
        args: &[f64],
    ) -> Result<PredictionValue, FlvError>;
}

impl<F> Prediction for F
where
    F: Fn(
            &EvalContext<'_>,
            &WilsonCoefficients,
            &ParameterStore,
            &[f64],
        ) -> Result<PredictionValue, FlvError>
        + Send
        + Sync,
{
    fn predict(
        &self,
        ctx: &EvalContext<'_>,
        wc: &WilsonCoefficients,
        par: &ParameterStore,
        args: &[f64],
    ) -> Result<PredictionValue, FlvError> {
        self(ctx, wc, par, args)
    }
}

/// Pins a closure to the prediction signature so its argument lifetimes are inferred.
pub fn prediction_fn<F>(f: F) -> F
where
    F: Fn(
            &EvalContext<'_>,
            &WilsonCoefficients,
            &ParameterStore,
            &[f64],
        ) -> Result<PredictionValue, FlvError>
        + Send
        + Sync,
{
    f
}

/// A named observable.
#[derive(Clone)]
pub struct Observable {
    name: String,
    description: String,
    arguments: Vec<String>,
    prediction: Option<Arc<dyn Prediction>>,
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("has_prediction", &self.prediction.is_some())
            .finish()
    }
}

impl Observable {
    /// Observable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Names of the kinematic arguments, in call order.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Whether a prediction is bound.
    pub fn has_prediction(&self) -> bool {
        self.prediction.is_some()
    }
}

/// An observable together with values for its kinematic arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableInstance {
    /// Observable name.
    pub name: String,
    /// Argument values, in the observable's argument order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<f64>,
}

impl ObservableInstance {
    /// Instance without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Instance with arguments.
    pub fn with_args(name: impl Into<String>, args: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for ObservableInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
            write!(f, "[{}]", args.join(", "))?;
        }
        Ok(())
    }
}

/// Registry of observables keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ObservableRegistry {
    observables: BTreeMap<String, Observable>,
}

impl ObservableRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a new observable; an existing name is a configuration error.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        arguments: &[&str],
    ) -> Result<(), FlvError> {
        let name = name.into();
        if self.observables.contains_key(&name) {
            return Err(FlvError::Configuration(
                ErrorInfo::new("observable-duplicate", "observable already defined")
                    .with_context("name", name)
                    .with_hint("use redefine to replace an observable explicitly"),
            ));
        }
        self.insert(name, description.into(), arguments);
        Ok(())
    }

    /// Defines or replaces an observable, dropping any bound prediction.
    ///
    /// Returns whether one was replaced.
    pub fn redefine(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        arguments: &[&str],
    ) -> bool {
        let name = name.into();
        let replaced = self.insert(name.clone(), description.into(), arguments);
        if replaced {
            warn!("observable `{name}` redefined");
        }
        replaced
    }

    fn insert(&mut self, name: String, description: String, arguments: &[&str]) -> bool {
        let observable = Observable {
            name: name.clone(),
            description,
            arguments: arguments.iter().map(|arg| arg.to_string()).collect(),
            prediction: None,
        };
        self.observables.insert(name, observable).is_some()
    }

    /// Binds `prediction` to `name`; a previous binding is overwritten with a warning.
    pub fn attach_prediction<P>(&mut self, name: &str, prediction: P) -> Result<(), FlvError>
    where
        P: Prediction + 'static,
    {
        let observable = self
            .observables
            .get_mut(name)
            .ok_or_else(|| not_found(name, "observable-not-defined", "observable is not defined"))?;
        if observable.prediction.is_some() {
            warn!("overwriting prediction bound to observable `{name}`");
        }
        observable.prediction = Some(Arc::new(prediction));
        Ok(())
    }

    /// Evaluates the prediction bound to `name`; the result is returned unchanged.
    pub fn evaluate(
        &self,
        ctx: &EvalContext<'_>,
        name: &str,
        wc: &WilsonCoefficients,
        par: &ParameterStore,
        args: &[f64],
    ) -> Result<PredictionValue, FlvError> {
        let observable = self
            .observables
            .get(name)
            .ok_or_else(|| not_found(name, "observable-not-defined", "observable is not defined"))?;
        let prediction = observable
            .prediction
            .as_ref()
            .ok_or_else(|| {
                not_found(name, "prediction-not-bound", "no prediction bound to observable")
            })?;
        if args.len() != observable.arguments.len() {
            return Err(FlvError::Configuration(
                ErrorInfo::new("observable-arguments", "wrong number of kinematic arguments")
                    .with_context("name", name)
                    .with_context("expected", observable.arguments.join(", "))
                    .with_context("received", args.len().to_string()),
            ));
        }
        prediction.predict(ctx, wc, par, args)
    }

    /// Observable registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Observable> {
        self.observables.get(name)
    }

    /// Whether `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.observables.contains_key(name)
    }

    /// Defined names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.observables.keys().map(String::as_str)
    }

    /// Number of defined observables.
    pub fn len(&self) -> usize {
        self.observables.len()
    }

    /// Whether no observable is defined.
    pub fn is_empty(&self) -> bool {
        self.observables.is_empty()
    }
}

fn not_found(name: &str, code: &str, message: &str) -> FlvError {
    FlvError::NotFound(ErrorInfo::new(code, message).with_context("name", name))
}
