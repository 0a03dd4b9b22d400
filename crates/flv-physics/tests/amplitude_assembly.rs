use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flv_core::{conjugate_parameters, Complex64, ParameterStore, PhysicsConfig, WilsonCoefficients};
use flv_physics::bvll::{self, helicity_amplitudes, SPECTATOR_SCATTERING_Q2_MAX};
use flv_physics::channels::{Lepton, QuarkTransition, VectorChannel};
use flv_physics::ckm::CkmMatrix;
use flv_physics::{
    default_parameters, provider_fn, AuxValue, Catalogue, Helicity, HelicityAmplitudes,
    Polarization,
};

fn defaults() -> ParameterStore {
    default_parameters().unwrap().default_store()
}

/// Catalogue whose muon and tau spectator providers count calls and return large amplitudes.
fn counting_catalogue(calls: Arc<AtomicUsize>) -> Catalogue {
    let mut builder = Catalogue::builder(PhysicsConfig::default())
        .unwrap()
        .with_form_factors()
        .unwrap()
        .with_vector_channel(VectorChannel::B0ToKStar0)
        .unwrap();
    let counter = Arc::clone(&calls);
    builder.auxiliary_mut().register_or_replace(
        VectorChannel::B0ToKStar0.spectator_name(Lepton::Mu),
        provider_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            let big = Complex64::new(1e3, 1e3);
            Ok(AuxValue::Helicity(
                HelicityAmplitudes::zero().with(Helicity::Zero, Polarization::V, big),
            ))
        }),
    );
    builder.build().unwrap()
}

#[test]
fn prefactor_vanishes_at_and_below_threshold() {
    let par = defaults();
    let config = PhysicsConfig::default();
    let ckm = CkmMatrix::from_parameters(&par).unwrap();
    let m_mu = par.get("m_mu").unwrap();
    let threshold = 4.0 * m_mu * m_mu;
    for q2 in [0.0, 0.5 * threshold, threshold] {
        let n = bvll::prefactor(&par, &config, &ckm, QuarkTransition::Bs, Lepton::Mu, q2)
            .unwrap();
        assert_eq!(n, Complex64::new(0.0, 0.0), "q2 = {q2}");
    }
    let above = threshold * (1.0 + 1e-9);
    let n = bvll::prefactor(&par, &config, &ckm, QuarkTransition::Bs, Lepton::Mu, above)
        .unwrap();
    assert!(n.norm() > 0.0);
}

#[test]
fn amplitudes_below_threshold_are_zero() {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
    let par = defaults();
    let m_tau = par.get("m_tau").unwrap();
    let amps = helicity_amplitudes(
        &catalogue.context(),
        &WilsonCoefficients::default(),
        &par,
        VectorChannel::B0ToKStar0,
        Lepton::Tau,
        4.0 * m_tau * m_tau,
        false,
    )
    .unwrap();
    assert!(amps.is_zero());
}

#[test]
fn spectator_scattering_skipped_for_tau_and_high_q2() {
    let calls = Arc::new(AtomicUsize::new(0));
    let catalogue = counting_catalogue(Arc::clone(&calls));
    let reference = Catalogue::standard(PhysicsConfig::default()).unwrap();
    let par = defaults();
    let wc = WilsonCoefficients::default();
    let amplitudes = |catalogue: &Catalogue, lepton, q2| {
        let ctx = catalogue.context();
        helicity_amplitudes(&ctx, &wc, &par, VectorChannel::B0ToKStar0, lepton, q2, false)
            .unwrap()
    };

    let cases = [
        (Lepton::Tau, 15.0),
        (Lepton::Mu, SPECTATOR_SCATTERING_Q2_MAX),
        (Lepton::Mu, 12.0),
    ];
    for (lepton, q2) in cases {
        assert_eq!(amplitudes(&catalogue, lepton, q2), amplitudes(&reference, lepton, q2));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    amplitudes(&catalogue, Lepton::Mu, 2.0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn muon_amplitudes_have_the_six_helicity_keys() {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
    let par = defaults()
        .with_overrides([("Gmu", 1.166e-5), ("m_mu", 0.10566)])
        .unwrap();
    let amps = helicity_amplitudes(
        &catalogue.context(),
        &WilsonCoefficients::default(),
        &par,
        VectorChannel::B0ToKStar0,
        Lepton::Mu,
        1.0,
        false,
    )
    .unwrap();
    let keys: Vec<_> = amps.keys().copied().collect();
    let expected = vec![
        (Helicity::Zero, Polarization::V),
        (Helicity::Zero, Polarization::A),
        (Helicity::Plus, Polarization::V),
        (Helicity::Plus, Polarization::A),
        (Helicity::Minus, Polarization::V),
        (Helicity::Minus, Polarization::A),
    ];
    assert_eq!(keys, expected);
    for (_, value) in amps.iter() {
        assert!(value.re.is_finite() && value.im.is_finite());
    }
    assert!(!amps.is_zero());
}

#[test]
fn conjugate_flag_matches_conjugated_inputs() {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
    let par = defaults();
    let wc = WilsonCoefficients::default().with("C9_bsmumu", Complex64::new(-1.0, 0.5));
    let wc_bar = WilsonCoefficients::default().with("C9_bsmumu", Complex64::new(-1.0, -0.5));

    let flagged = helicity_amplitudes(
        &catalogue.context(),
        &wc,
        &par,
        VectorChannel::BsToPhi,
        Lepton::E,
        3.0,
        true,
    )
    .unwrap();
    let manual = helicity_amplitudes(
        &catalogue.context(),
        &wc_bar,
        &conjugate_parameters(&par),
        VectorChannel::BsToPhi,
        Lepton::E,
        3.0,
        false,
    )
    .unwrap();
    for ((key, a), (_, b)) in flagged.iter().zip(manual.iter()) {
        assert!((a - b).norm() <= 1e-12 * (1.0 + a.norm()), "{key:?}: {a} vs {b}");
    }
}

#[test]
fn missing_form_factor_provider_is_not_found() {
    let catalogue = Catalogue::builder(PhysicsConfig::default())
        .unwrap()
        .build()
        .unwrap();
    let err = helicity_amplitudes(
        &catalogue.context(),
        &WilsonCoefficients::default(),
        &defaults(),
        VectorChannel::B0ToKStar0,
        Lepton::Mu,
        2.0,
        false,
    )
    .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.info().context["name"], "B->K* form factor");
}

#[test]
fn binned_rate_solves_the_ckm_matrix_once_per_cp_branch() {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
    let par = defaults();
    let ctx = catalogue.context();
    let binned = catalogue
        .observables()
        .evaluate(
            &ctx,
            "<dBR/dq2>(B0->K*0mumu)",
            &WilsonCoefficients::default(),
            &par,
            &[1.1, 6.0],
        )
        .unwrap()
        .as_real()
        .unwrap();
    assert!(binned > 0.0);
    assert_eq!(ctx.derived.ckm_solves(), 2);

    let fresh = catalogue.context();
    let direct = bvll::dbr_dq2_binned(
        &fresh,
        &WilsonCoefficients::default(),
        &par,
        VectorChannel::B0ToKStar0,
        Lepton::Mu,
        1.1,
        6.0,
    )
    .unwrap();
    assert_eq!(direct.to_bits(), binned.to_bits());
}
