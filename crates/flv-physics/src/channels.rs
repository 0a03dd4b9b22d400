//! Decay channel identifiers and the channel lookup table.
//!
//! String-keyed dispatch (channel to form factor family, channel to quark
//! transition) goes through [`ChannelTable`], which is checked for
//! completeness once, when the catalogue is built.

use std::collections::BTreeMap;
use std::fmt;

use flv_core::{config_error, ErrorInfo, FlvError};
use serde::{Deserialize, Serialize};

use crate::ckm::DownQuark;

/// Mesons that appear in channel labels and parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Meson {
    /// Neutral B.
    B0,
    /// Charged B.
    BPlus,
    /// Strange B.
    Bs,
    /// Neutral K*.
    KStar0,
    /// Charged K*.
    KStarPlus,
    /// phi(1020).
    Phi,
}

impl Meson {
    /// Label used in parameter names (`m_<label>`, `tau_<label>`).
    pub fn label(self) -> &'static str {
        match self {
            Meson::B0 => "B0",
            Meson::BPlus => "B+",
            Meson::Bs => "Bs",
            Meson::KStar0 => "K*0",
            Meson::KStarPlus => "K*+",
            Meson::Phi => "phi",
        }
    }
}

/// Charged leptons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Lepton {
    /// electron
    E,
    /// muon
    Mu,
    /// tau
    Tau,
}

impl Lepton {
    /// Every charged lepton, lightest first.
    pub const ALL: [Lepton; 3] = [Lepton::E, Lepton::Mu, Lepton::Tau];

    /// Short label (`e`, `mu`, `tau`).
    pub fn label(self) -> &'static str {
        match self {
            Lepton::E => "e",
            Lepton::Mu => "mu",
            Lepton::Tau => "tau",
        }
    }

    /// Name of the mass parameter.
    pub fn mass_parameter(self) -> String {
        format!("m_{}", self.label())
    }

    /// Whether long-distance corrections are computed for this lepton.
    pub fn is_light(self) -> bool {
        !matches!(self, Lepton::Tau)
    }
}

/// Neutrino flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Neutrino {
    /// electron neutrino
    NuE,
    /// muon neutrino
    NuMu,
    /// tau neutrino
    NuTau,
}

impl Neutrino {
    /// Fixed summation order for flavour-summed observables.
    pub const ALL: [Neutrino; 3] = [Neutrino::NuE, Neutrino::NuMu, Neutrino::NuTau];

    /// Short label used in coefficient names.
    pub fn label(self) -> &'static str {
        match self {
            Neutrino::NuE => "nue",
            Neutrino::NuMu => "numu",
            Neutrino::NuTau => "nutau",
        }
    }
}

/// Flavour-changing neutral current quark transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuarkTransition {
    /// b -> s
    Bs,
    /// b -> d
    Bd,
    /// s -> d
    Sd,
}

impl QuarkTransition {
    /// Label used as coefficient sector prefix (`bs`, `bd`, `sd`).
    pub fn label(self) -> &'static str {
        match self {
            QuarkTransition::Bs => "bs",
            QuarkTransition::Bd => "bd",
            QuarkTransition::Sd => "sd",
        }
    }

    /// Initial and final down-type quark.
    pub fn quarks(self) -> (DownQuark, DownQuark) {
        match self {
            QuarkTransition::Bs => (DownQuark::B, DownQuark::S),
            QuarkTransition::Bd => (DownQuark::B, DownQuark::D),
            QuarkTransition::Sd => (DownQuark::S, DownQuark::D),
        }
    }
}

/// Form factor parametrisations shared by several channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormFactorFamily {
    /// B -> K*
    BToKStar,
    /// Bs -> phi
    BsToPhi,
}

impl FormFactorFamily {
    /// Every family with a standard provider.
    pub const ALL: [FormFactorFamily; 2] = [FormFactorFamily::BToKStar, FormFactorFamily::BsToPhi];

    /// Family label, the prefix of its auxiliary name and parameters.
    pub fn label(self) -> &'static str {
        match self {
            FormFactorFamily::BToKStar => "B->K*",
            FormFactorFamily::BsToPhi => "Bs->phi",
        }
    }

    /// Name of the form factor auxiliary quantity.
    pub fn auxiliary_name(self) -> String {
        format!("{} form factor", self.label())
    }
}

/// Exclusive B -> V l+ l- channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VectorChannel {
    /// B0 -> K*0
    B0ToKStar0,
    /// B+ -> K*+
    BPlusToKStarPlus,
    /// Bs -> phi
    BsToPhi,
}

impl VectorChannel {
    /// Every channel in catalogue order.
    pub const ALL: [VectorChannel; 3] = [
        VectorChannel::B0ToKStar0,
        VectorChannel::BPlusToKStarPlus,
        VectorChannel::BsToPhi,
    ];

    /// Decaying meson.
    pub fn initial(self) -> Meson {
        match self {
            VectorChannel::B0ToKStar0 => Meson::B0,
            VectorChannel::BPlusToKStarPlus => Meson::BPlus,
            VectorChannel::BsToPhi => Meson::Bs,
        }
    }

    /// Final state vector meson.
    pub fn vector(self) -> Meson {
        match self {
            VectorChannel::B0ToKStar0 => Meson::KStar0,
            VectorChannel::BPlusToKStarPlus => Meson::KStarPlus,
            VectorChannel::BsToPhi => Meson::Phi,
        }
    }

    /// Process label such as `B0->K*0mumu`.
    pub fn process(self, lepton: Lepton) -> String {
        format!(
            "{}->{}{}{}",
            self.initial().label(),
            self.vector().label(),
            lepton.label(),
            lepton.label()
        )
    }

    /// Name of the spectator scattering auxiliary quantity for `lepton`.
    pub fn spectator_name(self, lepton: Lepton) -> String {
        format!("{} spectator scattering", self.process(lepton))
    }
}

impl fmt::Display for VectorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.initial().label(), self.vector().label())
    }
}

/// Static properties of a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelInfo {
    /// Quark level transition.
    pub transition: QuarkTransition,
    /// Form factor parametrisation.
    pub family: FormFactorFamily,
    /// Electric charge of the spectator quark in units of e.
    pub spectator_charge: f64,
}

/// Channel lookup table, complete over [`VectorChannel::ALL`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTable {
    entries: BTreeMap<VectorChannel, ChannelInfo>,
}

impl ChannelTable {
    /// Builds a table, failing if any channel lacks an entry.
    pub fn build(entries: BTreeMap<VectorChannel, ChannelInfo>) -> Result<Self, FlvError> {
        let missing: Vec<String> = VectorChannel::ALL
            .iter()
            .filter(|channel| !entries.contains_key(*channel))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(FlvError::Configuration(
                ErrorInfo::new("channel-table-incomplete", "channel table lacks entries")
                    .with_context("channels", missing.join(", ")),
            ));
        }
        Ok(Self { entries })
    }

    /// The table for the channels shipped with the crate.
    pub fn standard() -> Result<Self, FlvError> {
        let up = 2.0 / 3.0;
        let down = -1.0 / 3.0;
        Self::build(BTreeMap::from([
            (
                VectorChannel::B0ToKStar0,
                ChannelInfo {
                    transition: QuarkTransition::Bs,
                    family: FormFactorFamily::BToKStar,
                    spectator_charge: down,
                },
            ),
            (
                VectorChannel::BPlusToKStarPlus,
                ChannelInfo {
                    transition: QuarkTransition::Bs,
                    family: FormFactorFamily::BToKStar,
                    spectator_charge: up,
                },
            ),
            (
                VectorChannel::BsToPhi,
                ChannelInfo {
                    transition: QuarkTransition::Bs,
                    family: FormFactorFamily::BsToPhi,
                    spectator_charge: down,
                },
            ),
        ]))
    }

    /// Properties of `channel`.
    pub fn get(&self, channel: VectorChannel) -> Result<&ChannelInfo, FlvError> {
        self.entries.get(&channel).ok_or_else(|| {
            config_error(
                "channel-unknown",
                format!("no channel table entry for {channel}"),
            )
        })
    }

    /// Iterates over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&VectorChannel, &ChannelInfo)> {
        self.entries.iter()
    }
}
