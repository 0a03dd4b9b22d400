//! Structured error types shared across FLV crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`FlvError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (names, values, paths).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for prediction and fit code.
///
/// `Configuration`, `NotFound` and `MissingAuxiliary` describe an incomplete or
/// inconsistent catalogue and abort a run. `Domain` and `Numeric` describe a
/// single bad evaluation point and are scored as zero posterior probability
/// while sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum FlvError {
    /// Unknown names, duplicate registrations, inconsistent fit descriptions.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// Lookup of an unregistered observable, measurement or prediction.
    #[error("not found: {0}")]
    NotFound(ErrorInfo),
    /// No provider registered for an auxiliary quantity.
    #[error("missing auxiliary quantity: {0}")]
    MissingAuxiliary(ErrorInfo),
    /// Parameter value outside its physical support.
    #[error("domain error: {0}")]
    Domain(ErrorInfo),
    /// Non-finite result of an amplitude or likelihood combination.
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
    /// Sampler contract violations (shape mismatches, degenerate ensembles).
    #[error("sampler error: {0}")]
    Sampler(ErrorInfo),
    /// Serialization, schema and filesystem errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl FlvError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            FlvError::Configuration(info)
            | FlvError::NotFound(info)
            | FlvError::MissingAuxiliary(info)
            | FlvError::Domain(info)
            | FlvError::Numeric(info)
            | FlvError::Sampler(info)
            | FlvError::Serde(info) => info,
        }
    }

    /// Whether the error must abort a fit instead of rejecting a single point.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FlvError::Domain(_) | FlvError::Numeric(_))
    }

    /// Whether the error reports an unresolved name.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FlvError::NotFound(_) | FlvError::MissingAuxiliary(_))
    }
}

/// Shorthand for [`FlvError::Configuration`].
pub fn config_error(code: &str, message: impl Into<String>) -> FlvError {
    FlvError::Configuration(ErrorInfo::new(code, message.into()))
}

/// Shorthand for [`FlvError::Domain`].
pub fn domain_error(code: &str, message: impl Into<String>) -> FlvError {
    FlvError::Domain(ErrorInfo::new(code, message.into()))
}

/// Shorthand for [`FlvError::Numeric`].
pub fn numeric_error(code: &str, message: impl Into<String>) -> FlvError {
    FlvError::Numeric(ErrorInfo::new(code, message.into()))
}
