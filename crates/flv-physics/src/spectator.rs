//! Hard spectator scattering corrections to B -> V l+ l- at low q2.
//!
//! Only the vector current receives a correction; the axial entries are
//! present and zero so the result can be added to the short-distance set.

use std::f64::consts::PI;

use flv_core::{config_error, Complex64, FlvError};

use crate::auxiliary::{AuxContext, AuxValue, AuxiliaryProvider};
use crate::bvll;
use crate::channels::{ChannelInfo, Lepton, VectorChannel};
use crate::helicity::{Helicity, HelicityAmplitudes, Polarization};
use crate::running;
use crate::wilson::{self, Sector};

const CF: f64 = 4.0 / 3.0;
const NC: f64 = 3.0;

/// Provider of the `"<B>-><V><l><l> spectator scattering"` auxiliary quantity.
#[derive(Debug, Clone, Copy)]
pub struct SpectatorScatteringProvider {
    /// Decay channel.
    pub channel: VectorChannel,
    /// Charged lepton.
    pub lepton: Lepton,
    /// Channel properties resolved at registration.
    pub info: ChannelInfo,
}

impl AuxiliaryProvider for SpectatorScatteringProvider {
    fn evaluate(&self, ctx: &AuxContext<'_>) -> Result<AuxValue, FlvError> {
        let wc = ctx.wc.ok_or_else(|| {
            config_error(
                "spectator-without-coefficients",
                format!("{} needs sector coefficients", self.channel.spectator_name(self.lepton)),
            )
        })?;
        let par = ctx.par;
        let q2 = ctx.q2;
        let scale = ctx.config.renormalization_scale.bvll;
        let m_b_meson = par.get_positive(&format!("m_{}", self.channel.initial().label()))?;
        let f_b = par.get_positive(&format!("f_{}", self.channel.initial().label()))?;
        let f_v = par.get_positive(&format!("f_{}", self.channel.vector().label()))?;
        let lambda_b = par.get_positive("lambda_B")?;
        let alpha_s = running::alpha_s(par, scale)?;
        let mb = running::m_b(par, scale)?;

        let ckm = ctx.derived.ckm(par)?;
        let n = bvll::prefactor(par, ctx.config, &ckm, self.info.transition, self.lepton, q2)?;
        if n == Complex64::default() {
            return Ok(AuxValue::Helicity(HelicityAmplitudes::zero()));
        }
        let sector = Sector::Dilepton(self.info.transition, self.lepton);
        let eff = wilson::effective_coefficients(wc, sector, q2, par)?;

        let kappa = alpha_s * CF / (4.0 * PI) * PI * PI * f_b * f_v
            / (NC * m_b_meson * lambda_b)
            * self.info.spectator_charge;
        let i = Complex64::new(0.0, 1.0);
        let transverse =
            -i * n * m_b_meson * (2.0 * mb * m_b_meson / q2) * kappa * (eff.c7 - eff.c7p);
        let longitudinal = -i * n * m_b_meson * (m_b_meson / q2.sqrt())
            * kappa
            * (2.0 * mb / m_b_meson * (eff.c7 - eff.c7p)
                + q2 / (m_b_meson * m_b_meson) * (eff.c9 - eff.c9p));

        let amps = HelicityAmplitudes::zero()
            .with(Helicity::Minus, Polarization::V, transverse)
            .with(Helicity::Zero, Polarization::V, longitudinal);
        Ok(AuxValue::Helicity(amps))
    }
}
