use flv_core::{Complex64, ParameterStore, PhysicsConfig, WilsonCoefficients};
use flv_physics::channels::Neutrino;
use flv_physics::kpinunu::{br_klong, br_kplus};
use flv_physics::{default_parameters, Catalogue};
use proptest::prelude::*;

fn par() -> ParameterStore {
    default_parameters().unwrap().default_store()
}

fn coefficient_strategy() -> impl Strategy<Value = WilsonCoefficients> {
    proptest::collection::vec((0usize..9, -2.0f64..2.0, -2.0f64..2.0), 0..4).prop_map(|entries| {
        entries
            .into_iter()
            .fold(WilsonCoefficients::default(), |wc, (pair, re, im)| {
                let nu1 = Neutrino::ALL[pair / 3].label();
                let nu2 = Neutrino::ALL[pair % 3].label();
                wc.with(format!("CL_sd{nu1}{nu2}"), Complex64::new(re, im))
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn summed_branching_ratios_equal_per_flavour_sum(wc in coefficient_strategy()) {
        let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
        let par = par();
        let ctx = catalogue.context();

        for name in ["BR(K+->pinunu)", "BR(KL->pinunu)"] {
            let summed = catalogue.evaluate(name, &wc, &par, &[]).unwrap().as_real().unwrap();
            let mut reversed = 0.0;
            for nu1 in Neutrino::ALL.iter().rev() {
                for nu2 in Neutrino::ALL.iter().rev() {
                    reversed += if name.starts_with("BR(K+") {
                        br_kplus(&ctx, &wc, &par, *nu1, *nu2).unwrap()
                    } else {
                        br_klong(&ctx, &wc, &par, *nu1, *nu2).unwrap()
                    };
                }
            }
            prop_assert!((summed - reversed).abs() <= 1e-12 * summed.abs());

            let again = catalogue.evaluate(name, &wc, &par, &[]).unwrap().as_real().unwrap();
            prop_assert_eq!(summed.to_bits(), again.to_bits());
        }
    }
}

#[test]
fn flavour_sum_solves_the_ckm_matrix_once() {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
    let ctx = catalogue.context();
    let br = catalogue
        .observables()
        .evaluate(&ctx, "BR(K+->pinunu)", &WilsonCoefficients::default(), &par(), &[])
        .unwrap()
        .as_real()
        .unwrap();
    assert!(br > 0.0);
    assert_eq!(ctx.derived.ckm_solves(), 1);
}

#[test]
fn off_diagonal_flavours_vanish_in_the_standard_model() {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
    let br = br_kplus(
        &catalogue.context(),
        &WilsonCoefficients::default(),
        &par(),
        Neutrino::NuE,
        Neutrino::NuTau,
    )
    .unwrap();
    assert_eq!(br, 0.0);
}
