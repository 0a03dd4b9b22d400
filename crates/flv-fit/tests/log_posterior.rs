mod common;

use std::sync::Arc;

use common::{ckm_catalogue, schema};
use flv_core::{normal_log_pdf, Distribution, FlvError, PhysicsConfig, WilsonCoefficients};
use flv_fit::{CoefficientComponent, Constraint, FitSpec, LogPosterior, Measurement};
use flv_physics::{prediction_fn, Catalogue, ObservableInstance, PredictionValue};

fn posterior(fit: &FitSpec, measurements: Vec<Measurement>) -> LogPosterior {
    LogPosterior::new(
        fit,
        ckm_catalogue(),
        &schema(),
        measurements,
        WilsonCoefficients::default(),
    )
    .unwrap()
}

#[test]
fn out_of_support_candidates_score_minus_infinity() {
    let fit = FitSpec::new("mixing")
        .with_fit_parameters(["Vcb"])
        .with_nuisance_parameters(["bag_B0_1"])
        .with_measurements(["DeltaM_d"]);
    let post = posterior(
        &fit,
        vec![Measurement::normal("DeltaM_d", ObservableInstance::new("DeltaM_d"), 0.5065, 0.0019)],
    );
    let err = post.evaluate(&[0.041, -0.5]).unwrap_err();
    assert!(matches!(err, FlvError::Domain(_)));
    assert_eq!(post.log_posterior(&[0.041, -0.5]), f64::NEG_INFINITY);
    assert_eq!(post.log_posterior(&[1.5, 1.3]), f64::NEG_INFINITY);
    assert!(post.take_fatal().is_none());
    assert!(post.log_posterior(&[0.041, 1.3]).is_finite());
}

#[test]
fn nuisance_priors_add_to_the_likelihood() {
    let fit = FitSpec::new("gamma")
        .with_nuisance_parameters(["gamma"])
        .with_measurements(["gamma"]);
    let post = posterior(
        &fit,
        vec![Measurement::normal("gamma", ObservableInstance::new("gamma"), 1.15, 0.07)],
    );
    let prior = schema().require("gamma").unwrap().uncertainty.clone().unwrap();
    let x = 1.2;
    let expected = normal_log_pdf(x, 1.15, 0.07) + prior.log_pdf(x);
    assert!((post.log_posterior(&[x]) - expected).abs() < 1e-9);
    assert_eq!(prior, Distribution::normal(1.27, 0.08));
}

#[test]
fn excluded_observables_are_marginalised_out() {
    let measurement = Measurement {
        name: "CKM moduli".into(),
        description: String::new(),
        constraints: vec![Constraint::from_correlation(
            vec![ObservableInstance::new("|V_us|"), ObservableInstance::new("|V_cb|")],
            vec![0.2245, 0.0410],
            &[0.0008, 0.0014],
            &[vec![1.0, 0.3], vec![0.3, 1.0]],
        )
        .unwrap()],
        derived_under: Default::default(),
    };
    let fit = FitSpec::new("Vus only")
        .with_fit_parameters(["Vus"])
        .with_measurements(["CKM moduli"])
        .excluding("|V_cb|");
    let post = posterior(&fit, vec![measurement]);
    assert_eq!(post.observables(), [ObservableInstance::new("|V_us|")]);
    let expected = normal_log_pdf(0.2250, 0.2245, 0.0008);
    assert!((post.log_posterior(&[0.2250]) - expected).abs() < 1e-6);
}

#[test]
fn excluding_every_observable_leaves_nothing_to_fit() {
    let fit = FitSpec::new("empty")
        .with_fit_parameters(["Vus"])
        .with_measurements(["Vus"])
        .excluding("|V_us|");
    let err = LogPosterior::new(
        &fit,
        ckm_catalogue(),
        &schema(),
        vec![Measurement::normal("Vus", ObservableInstance::new("|V_us|"), 0.2245, 0.0008)],
        WilsonCoefficients::default(),
    )
    .unwrap_err();
    assert_eq!(err.info().code, "fit-no-constraints");
}

#[test]
fn coefficient_components_set_real_and_imaginary_parts() {
    let mut builder = Catalogue::builder(PhysicsConfig::default()).unwrap();
    builder
        .observables_mut()
        .define("|C9 test|", "modulus of a test coefficient", &[])
        .unwrap();
    builder
        .observables_mut()
        .attach_prediction(
            "|C9 test|",
            prediction_fn(|_, wc, _, _| Ok(PredictionValue::Real(wc.get("C9_test").norm()))),
        )
        .unwrap();
    builder.declare_coefficients(["C9_test"]);
    let catalogue = Arc::new(builder.build().unwrap());
    let fit = FitSpec::new("coefficient fit")
        .with_coefficient(CoefficientComponent::real("C9_test"))
        .with_coefficient(CoefficientComponent::imaginary("C9_test"))
        .with_measurements(["C9 test 2023"]);
    let post = LogPosterior::new(
        &fit,
        catalogue,
        &schema(),
        vec![Measurement::normal("C9 test 2023", ObservableInstance::new("|C9 test|"), 5.0, 1.0)],
        WilsonCoefficients::default(),
    )
    .unwrap();
    assert_eq!(post.labels(), ["Re(C9_test)", "Im(C9_test)"]);
    assert_eq!(post.starting_point(), [0.0, 0.0]);
    let at_peak = post.log_posterior(&[3.0, 4.0]);
    assert!((at_peak - normal_log_pdf(5.0, 5.0, 1.0)).abs() < 1e-12);
    assert!(post.log_posterior(&[3.0, 0.0]) < at_peak);
}

#[test]
fn wrong_dimension_is_fatal_and_parked() {
    let fit = FitSpec::new("dim")
        .with_fit_parameters(["Vus"])
        .with_measurements(["Vus"]);
    let post = posterior(
        &fit,
        vec![Measurement::normal("Vus", ObservableInstance::new("|V_us|"), 0.2245, 0.0008)],
    );
    assert_eq!(post.log_posterior(&[0.22, 0.1]), f64::NEG_INFINITY);
    let fatal = post.take_fatal().unwrap();
    assert!(matches!(fatal, FlvError::Sampler(_)));
    assert!(post.take_fatal().is_none());
}
