//! The catalogue: auxiliary quantities, channel table and observables built
//! once and shared read-only by every evaluation.

use std::collections::BTreeSet;

use flv_core::{ErrorInfo, FlvError, ParameterStore, PhysicsConfig, WilsonCoefficients};
use log::info;

use crate::auxiliary::{AuxiliaryProvider, AuxiliaryRegistry};
use crate::bvll;
use crate::channels::{
    ChannelTable, FormFactorFamily, Lepton, Neutrino, QuarkTransition, VectorChannel,
};
use crate::derived::DerivedCache;
use crate::formfactors::FormFactorProvider;
use crate::kpinunu;
use crate::mixing;
use crate::observables::{EvalContext, ObservableInstance, ObservableRegistry, PredictionValue};
use crate::spectator::SpectatorScatteringProvider;
use crate::treelevel;
use crate::wilson::Sector;

/// Mutable registration phase of a [`Catalogue`].
#[derive(Debug)]
pub struct CatalogueBuilder {
    config: PhysicsConfig,
    channels: ChannelTable,
    aux: AuxiliaryRegistry,
    observables: ObservableRegistry,
    channels_in_use: BTreeSet<VectorChannel>,
    coefficients: BTreeSet<String>,
}

impl CatalogueBuilder {
    /// Empty builder over the standard channel table.
    pub fn new(config: PhysicsConfig) -> Result<Self, FlvError> {
        Ok(Self {
            config,
            channels: ChannelTable::standard()?,
            aux: AuxiliaryRegistry::new(),
            observables: ObservableRegistry::new(),
            channels_in_use: BTreeSet::new(),
            coefficients: BTreeSet::new(),
        })
    }

    /// Registers an auxiliary provider; duplicates are rejected.
    pub fn register_auxiliary<P>(
        &mut self,
        name: impl Into<String>,
        provider: P,
    ) -> Result<(), FlvError>
    where
        P: AuxiliaryProvider + 'static,
    {
        self.aux.register(name, provider)
    }

    /// Mutable access to the auxiliary registry.
    pub fn auxiliary_mut(&mut self) -> &mut AuxiliaryRegistry {
        &mut self.aux
    }

    /// Mutable access to the observable registry.
    pub fn observables_mut(&mut self) -> &mut ObservableRegistry {
        &mut self.observables
    }

    /// Declares coefficient names read by custom predictions.
    pub fn declare_coefficients<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.coefficients.extend(names.into_iter().map(Into::into));
    }

    fn serve_sector(&mut self, sector: Sector) {
        self.declare_coefficients(sector.coefficient_names());
    }

    /// Registers the standard form factor providers of every family.
    pub fn with_form_factors(mut self) -> Result<Self, FlvError> {
        for family in FormFactorFamily::ALL {
            self.aux
                .register(family.auxiliary_name(), FormFactorProvider { family })?;
        }
        Ok(self)
    }

    /// Registers the spectator scattering providers and q2 observables of `channel`.
    pub fn with_vector_channel(mut self, channel: VectorChannel) -> Result<Self, FlvError> {
        let info = *self.channels.get(channel)?;
        for lepton in Lepton::ALL {
            if lepton.is_light() {
                self.aux.register(
                    channel.spectator_name(lepton),
                    SpectatorScatteringProvider {
                        channel,
                        lepton,
                        info,
                    },
                )?;
            }
            bvll::register(&mut self.observables, channel, lepton)?;
            self.serve_sector(Sector::Dilepton(info.transition, lepton));
        }
        self.channels_in_use.insert(channel);
        Ok(self)
    }

    /// Registers the rare kaon decay observables.
    pub fn with_kaon_decays(mut self) -> Result<Self, FlvError> {
        kpinunu::register(&mut self.observables)?;
        for nu1 in Neutrino::ALL {
            for nu2 in Neutrino::ALL {
                self.serve_sector(Sector::Dineutrino(QuarkTransition::Sd, nu1, nu2));
            }
        }
        Ok(self)
    }

    /// Registers CKM, tree-level and mixing observables.
    pub fn with_ckm_observables(mut self) -> Result<Self, FlvError> {
        treelevel::register(&mut self.observables)?;
        mixing::register(&mut self.observables)?;
        Ok(self)
    }

    /// Checks that every channel in use has its auxiliary quantities, then freezes the catalogue.
    pub fn build(self) -> Result<Catalogue, FlvError> {
        for channel in &self.channels_in_use {
            let info = self.channels.get(*channel)?;
            let mut required = vec![info.family.auxiliary_name()];
            required.extend(
                Lepton::ALL
                    .iter()
                    .filter(|lepton| lepton.is_light())
                    .map(|&lepton| channel.spectator_name(lepton)),
            );
            if let Some(missing) = required.iter().find(|name| !self.aux.contains(name)) {
                return Err(FlvError::MissingAuxiliary(
                    ErrorInfo::new("catalogue-incomplete", "channel lacks an auxiliary provider")
                        .with_context("channel", channel.to_string())
                        .with_context("name", missing.clone()),
                ));
            }
        }
        info!(
            "catalogue built with {} observables and {} auxiliary quantities",
            self.observables.len(),
            self.aux.names().count()
        );
        Ok(Catalogue {
            config: self.config,
            channels: self.channels,
            aux: self.aux,
            observables: self.observables,
            coefficients: self.coefficients,
        })
    }
}

/// Immutable catalogue shared by reference (or `Arc`) across threads.
#[derive(Debug, Clone)]
pub struct Catalogue {
    config: PhysicsConfig,
    channels: ChannelTable,
    aux: AuxiliaryRegistry,
    observables: ObservableRegistry,
    coefficients: BTreeSet<String>,
}

impl Catalogue {
    /// Builder for a custom catalogue.
    pub fn builder(config: PhysicsConfig) -> Result<CatalogueBuilder, FlvError> {
        CatalogueBuilder::new(config)
    }

    /// Catalogue with every channel and observable shipped with the crate.
    pub fn standard(config: PhysicsConfig) -> Result<Self, FlvError> {
        let mut builder = CatalogueBuilder::new(config)?.with_form_factors()?;
        for channel in VectorChannel::ALL {
            builder = builder.with_vector_channel(channel)?;
        }
        builder.with_kaon_decays()?.with_ckm_observables()?.build()
    }

    /// Fresh evaluation context borrowing the catalogue, with an empty memo.
    pub fn context(&self) -> EvalContext<'_> {
        EvalContext {
            aux: &self.aux,
            channels: &self.channels,
            config: &self.config,
            derived: DerivedCache::new(),
        }
    }

    /// Evaluates observable `name` with kinematic `args`.
    pub fn evaluate(
        &self,
        name: &str,
        wc: &WilsonCoefficients,
        par: &ParameterStore,
        args: &[f64],
    ) -> Result<PredictionValue, FlvError> {
        self.observables.evaluate(&self.context(), name, wc, par, args)
    }

    /// Evaluates an observable instance as a real number.
    pub fn evaluate_instance(
        &self,
        instance: &ObservableInstance,
        wc: &WilsonCoefficients,
        par: &ParameterStore,
    ) -> Result<f64, FlvError> {
        self.evaluate(&instance.name, wc, par, &instance.args)?.as_real()
    }

    /// Observable registry.
    pub fn observables(&self) -> &ObservableRegistry {
        &self.observables
    }

    /// Auxiliary registry.
    pub fn auxiliary(&self) -> &AuxiliaryRegistry {
        &self.aux
    }

    /// Coefficient names read by at least one registered prediction.
    pub fn coefficient_names(&self) -> &BTreeSet<String> {
        &self.coefficients
    }

    /// Whether some prediction reads coefficient `name`.
    pub fn serves_coefficient(&self, name: &str) -> bool {
        self.coefficients.contains(name)
    }

    /// Channel table.
    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Physics configuration.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }
}
