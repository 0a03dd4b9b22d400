#![deny(missing_docs)]
#![doc = "Core parameter, coefficient and error types shared by the FLV prediction and fit crates."]

pub mod coefficients;
/// YAML physics configuration (renormalisation scales).
pub mod config;
pub mod conjugation;
pub mod distributions;
pub mod errors;
pub mod parameters;
pub mod provenance;
pub mod rng;

pub use coefficients::{WcSet, WilsonCoefficients};
pub use config::{PhysicsConfig, RenormalizationScales};
pub use conjugation::{conjugate_coefficients, conjugate_parameters};
pub use distributions::{normal_log_pdf, Distribution, Support};
pub use errors::{config_error, domain_error, numeric_error, ErrorInfo, FlvError};
pub use parameters::{ParameterSchema, ParameterSpec, ParameterStore, ParameterValue};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};

pub use num_complex::Complex64;
