#![deny(missing_docs)]

//! Observable predictions for flavour physics: auxiliary quantities, amplitude
//! assembly with CP conjugation, and the observable catalogue.

/// Named providers of derived quantities.
pub mod auxiliary;
/// Exclusive B -> V l+ l- amplitudes and observables.
pub mod bvll;
/// Catalogue builder and the immutable catalogue.
pub mod catalogue;
/// Channel identifiers and lookup table.
pub mod channels;
/// CKM matrix.
pub mod ckm;
/// Kinematic helpers.
pub mod common;
/// Built-in parameter table and loaders.
pub mod defaults;
/// Per-evaluation memo of derived quantities.
pub mod derived;
/// B -> V form factors.
pub mod formfactors;
/// Helicity amplitude sets.
pub mod helicity;
/// K -> pi nu nubar.
pub mod kpinunu;
/// Neutral meson mixing.
pub mod mixing;
/// Observable registry.
pub mod observables;
/// Running couplings and masses.
pub mod running;
/// Spectator scattering corrections.
pub mod spectator;
/// Tree-level CKM observables.
pub mod treelevel;
/// Sector coefficients.
pub mod wilson;

pub use auxiliary::{provider_fn, AuxContext, AuxValue, AuxiliaryProvider, AuxiliaryRegistry};
pub use catalogue::{Catalogue, CatalogueBuilder};
pub use channels::{ChannelTable, Lepton, Meson, Neutrino, QuarkTransition, VectorChannel};
pub use defaults::{default_parameters, BuiltinParameters, ParameterSource, YamlParameters};
pub use derived::DerivedCache;
pub use helicity::{Helicity, HelicityAmplitudes, Polarization};
pub use observables::{
    prediction_fn, EvalContext, ObservableInstance, ObservableRegistry, Prediction,
    PredictionValue,
};
