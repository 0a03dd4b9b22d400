mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{ckm_catalogue, ckm_fit, ckm_measurements, schema, short_config, CountingSampler};
use flv_core::{domain_error, FlvError, PhysicsConfig};
use flv_fit::{
    CoefficientComponent, EnsembleScan, FitSpec, InMemoryMeasurements, Measurement, ScanState,
};
use flv_physics::{prediction_fn, Catalogue, ObservableInstance, PredictionValue, VectorChannel};

fn scan_with_counter(
    fit: FitSpec,
    steps: usize,
    burnin: usize,
) -> (EnsembleScan, CountingSampler) {
    scan_on_catalogue(fit, ckm_catalogue(), steps, burnin)
}

fn scan_on_catalogue(
    fit: FitSpec,
    catalogue: Arc<Catalogue>,
    steps: usize,
    burnin: usize,
) -> (EnsembleScan, CountingSampler) {
    let counter = CountingSampler::default();
    let shared = CountingSampler {
        calls: Arc::clone(&counter.calls),
    };
    let scan = EnsembleScan::new(
        fit,
        short_config(steps, burnin),
        catalogue,
        schema(),
        Arc::new(ckm_measurements()),
    )
    .with_sampler(shared);
    (scan, counter)
}

#[test]
fn unknown_fit_parameter_fails_before_any_sampler_call() {
    let fit = ckm_fit().with_fit_parameters(["not_a_parameter"]);
    let (mut scan, counter) = scan_with_counter(fit, 50, 5);
    let err = scan.run().unwrap_err();
    assert!(matches!(err, FlvError::Configuration(_)));
    assert_eq!(err.info().context["parameter"], "not_a_parameter");
    assert_eq!(scan.state(), ScanState::Failed);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_measurement_fails_before_any_sampler_call() {
    let fit = ckm_fit().with_measurements(["missing 1999"]);
    let (mut scan, counter) = scan_with_counter(fit, 50, 5);
    let err = scan.prepare().unwrap_err();
    assert_eq!(err.info().code, "measurement-unknown");
    assert_eq!(scan.state(), ScanState::Failed);
    assert!(scan.run().is_err());
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_fit_coefficient_fails_before_any_sampler_call() {
    let catalogue = Catalogue::builder(PhysicsConfig::default())
        .unwrap()
        .with_form_factors()
        .unwrap()
        .with_vector_channel(VectorChannel::B0ToKStar0)
        .unwrap()
        .with_ckm_observables()
        .unwrap()
        .build()
        .unwrap();
    let catalogue = Arc::new(catalogue);

    let fit = ckm_fit().with_coefficient(CoefficientComponent::real("C9_typo_bsmumu"));
    let (mut scan, counter) = scan_on_catalogue(fit, Arc::clone(&catalogue), 50, 5);
    let err = scan.prepare().unwrap_err();
    assert!(matches!(err, FlvError::Configuration(_)));
    assert_eq!(err.info().code, "fit-coefficient-unknown");
    assert_eq!(err.info().context["coefficient"], "C9_typo_bsmumu");
    assert_eq!(scan.state(), ScanState::Failed);
    assert!(scan.run().is_err());
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);

    let fit = ckm_fit().with_coefficient(CoefficientComponent::real("C9_bsmumu"));
    let (mut scan, _) = scan_on_catalogue(fit, catalogue, 50, 5);
    scan.prepare().unwrap();
    assert_eq!(scan.state(), ScanState::Ready);
}

#[test]
fn domain_error_while_placing_walkers_is_fatal() {
    let mut builder = Catalogue::builder(PhysicsConfig::default()).unwrap();
    builder
        .observables_mut()
        .define("unphysical", "always outside its domain", &[])
        .unwrap();
    builder
        .observables_mut()
        .attach_prediction(
            "unphysical",
            prediction_fn(|_, _, _, _| Err(domain_error("unphysical", "no physical region"))),
        )
        .unwrap();
    let measurements = InMemoryMeasurements::from_measurements([Measurement::normal(
        "unphysical 2023",
        ObservableInstance::new("unphysical"),
        1.0,
        0.1,
    )])
    .unwrap();
    let fit = FitSpec::new("unphysical fit")
        .with_fit_parameters(["Vus"])
        .with_measurements(["unphysical 2023"]);
    let counter = CountingSampler::default();
    let shared = CountingSampler {
        calls: Arc::clone(&counter.calls),
    };
    let mut scan = EnsembleScan::new(
        fit,
        short_config(50, 5),
        Arc::new(builder.build().unwrap()),
        schema(),
        Arc::new(measurements),
    )
    .with_sampler(shared);

    scan.prepare().unwrap();
    let err = scan.run().unwrap_err();
    assert!(matches!(err, FlvError::Domain(_)));
    assert_eq!(err.info().code, "unphysical");
    assert_eq!(scan.state(), ScanState::Failed);
    assert!(scan.result().is_none());
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_observable_is_a_configuration_error() {
    let measurements = InMemoryMeasurements::from_measurements([Measurement::normal(
        "bogus",
        ObservableInstance::new("BR(nothing)"),
        1.0,
        0.1,
    )])
    .unwrap();
    let fit = FitSpec::new("bogus fit")
        .with_fit_parameters(["Vus"])
        .with_measurements(["bogus"]);
    let mut scan = EnsembleScan::new(
        fit,
        short_config(20, 2),
        ckm_catalogue(),
        schema(),
        Arc::new(measurements),
    );
    let err = scan.prepare().unwrap_err();
    assert!(matches!(err, FlvError::Configuration(_)));
    assert_eq!(err.info().code, "observable-unknown");
    assert_eq!(err.info().context["name"], "BR(nothing)");
}

#[test]
fn stub_sampler_is_called_once_per_step() {
    let (mut scan, counter) = scan_with_counter(ckm_fit(), 40, 15);
    scan.prepare().unwrap();
    assert_eq!(scan.state(), ScanState::Ready);
    let result = scan.run().unwrap();
    assert_eq!(result.chain.len(), 8 * 25);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 40);
    assert_eq!(scan.state(), ScanState::Complete);
}

#[test]
fn retained_samples_exclude_burn_in() {
    let mut scan = EnsembleScan::new(
        ckm_fit(),
        short_config(600, 10),
        ckm_catalogue(),
        schema(),
        Arc::new(ckm_measurements()),
    );
    let result = scan.run().unwrap();
    let chain = &result.chain;
    assert_eq!(chain.n_walkers(), 8);
    assert_eq!(chain.len(), chain.n_walkers() * 590);
    assert_eq!(chain.n_steps(), 590);
    assert!(chain.samples().iter().all(|s| s.step >= 10));
    assert!(chain.samples().iter().all(|s| s.log_posterior.is_finite()));
    assert_eq!(chain.parameter_names(), ["Vus", "Vub", "Vcb", "gamma"]);
    assert_eq!(scan.state(), ScanState::Complete);
}

#[test]
fn completed_scans_cannot_run_again() {
    let (mut scan, _) = scan_with_counter(ckm_fit(), 12, 2);
    scan.run().unwrap();
    let err = scan.run().unwrap_err();
    assert_eq!(err.info().code, "scan-state");
}

#[test]
fn same_seed_gives_the_same_chain_on_any_thread_count() {
    let run = |threads| {
        let mut config = short_config(60, 5);
        config.threads = Some(threads);
        let mut scan = EnsembleScan::new(
            ckm_fit(),
            config,
            ckm_catalogue(),
            schema(),
            Arc::new(ckm_measurements()),
        );
        scan.run().unwrap().chain.clone()
    };
    assert_eq!(run(1), run(3));
}

#[test]
fn fatal_error_during_sampling_aborts_the_run() {
    let mut builder = Catalogue::builder(PhysicsConfig::default()).unwrap();
    builder
        .observables_mut()
        .define("fragile Vus", "Vus until a provider is needed", &[])
        .unwrap();
    builder
        .observables_mut()
        .attach_prediction(
            "fragile Vus",
            prediction_fn(|ctx, _, par, _| {
                let vus = par.get("Vus")?;
                if vus > 0.2252 {
                    ctx.aux.resolve("unregistered provider")?;
                }
                Ok(PredictionValue::Real(vus))
            }),
        )
        .unwrap();
    let catalogue = Arc::new(builder.build().unwrap());
    let measurements = InMemoryMeasurements::from_measurements([Measurement::normal(
        "pull upwards",
        ObservableInstance::new("fragile Vus"),
        0.2300,
        0.0010,
    )])
    .unwrap();
    let fit = FitSpec::new("fragile")
        .with_fit_parameters(["Vus"])
        .with_measurements(["pull upwards"]);
    let mut config = short_config(500, 10);
    config.walkers = Some(8);
    let mut scan = EnsembleScan::new(
        fit,
        config,
        catalogue,
        schema(),
        Arc::new(measurements),
    );
    let err = scan.run().unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(scan.state(), ScanState::Failed);
    assert!(scan.result().is_none());
}
