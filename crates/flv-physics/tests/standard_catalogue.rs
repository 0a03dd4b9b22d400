use flv_core::{PhysicsConfig, WilsonCoefficients};
use flv_physics::{default_parameters, Catalogue, ObservableInstance};

fn evaluate(catalogue: &Catalogue, name: &str, args: Vec<f64>) -> f64 {
    let par = default_parameters().unwrap().default_store();
    catalogue
        .evaluate_instance(
            &ObservableInstance::with_args(name, args),
            &WilsonCoefficients::default(),
            &par,
        )
        .unwrap()
}

#[test]
fn standard_model_predictions_have_expected_magnitudes() {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();

    let dbr = evaluate(&catalogue, "dBR/dq2(B0->K*0mumu)", vec![2.0]);
    assert!(dbr > 1e-9 && dbr < 1e-6, "dBR/dq2 = {dbr}");

    let binned = evaluate(&catalogue, "<dBR/dq2>(B0->K*0mumu)", vec![1.1, 6.0]);
    assert!(binned > 1e-9 && binned < 1e-6, "<dBR/dq2> = {binned}");

    let fl = evaluate(&catalogue, "FL(Bs->phimumu)", vec![2.0]);
    assert!(fl > 0.0 && fl < 1.0, "FL = {fl}");

    let kplus = evaluate(&catalogue, "BR(K+->pinunu)", vec![]);
    assert!(kplus > 3e-11 && kplus < 3e-10, "BR(K+->pinunu) = {kplus}");

    let klong = evaluate(&catalogue, "BR(KL->pinunu)", vec![]);
    assert!(klong > 5e-12 && klong < kplus, "BR(KL->pinunu) = {klong}");

    let vus = evaluate(&catalogue, "|V_us|", vec![]);
    assert!((vus - 0.2248).abs() < 1e-10);
    let gamma = evaluate(&catalogue, "gamma", vec![]);
    assert!((gamma - 1.27).abs() < 1e-9);

    let dmd = evaluate(&catalogue, "DeltaM_d", vec![]);
    assert!(dmd > 0.3 && dmd < 0.8, "DeltaM_d = {dmd}");
    let dms = evaluate(&catalogue, "DeltaM_s", vec![]);
    assert!(dms > 10.0 && dms < 30.0, "DeltaM_s = {dms}");

    let s_psik = evaluate(&catalogue, "S_psiK", vec![]);
    assert!(s_psik > 0.5 && s_psik < 0.9, "S_psiK = {s_psik}");

    let eps = evaluate(&catalogue, "eps_K", vec![]);
    assert!(eps > 1e-3 && eps < 4e-3, "eps_K = {eps}");

    let btaunu = evaluate(&catalogue, "BR(B+->taunu)", vec![]);
    assert!(btaunu > 5e-5 && btaunu < 2e-4, "BR(B+->taunu) = {btaunu}");
}

#[test]
fn every_registered_observable_has_a_prediction() {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
    let observables = catalogue.observables();
    assert!(observables.len() >= 27 + 2 + 9);
    for name in observables.names() {
        assert!(observables.get(name).unwrap().has_prediction(), "{name}");
    }
}

#[test]
fn catalogue_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Catalogue>();
}

#[test]
fn served_coefficients_follow_registered_sectors() {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
    for name in ["C7eff_bs", "C9_bsmumu", "C10p_bstautau", "CL_sdnuenutau", "CR_sdnumunumu"] {
        assert!(catalogue.serves_coefficient(name), "{name}");
    }
    assert!(!catalogue.serves_coefficient("C9_bdmumu"));
    assert!(!catalogue.serves_coefficient("C9_typo_bsmumu"));

    let ckm_only = Catalogue::builder(PhysicsConfig::default())
        .unwrap()
        .with_ckm_observables()
        .unwrap()
        .build()
        .unwrap();
    assert!(ckm_only.coefficient_names().is_empty());
}
