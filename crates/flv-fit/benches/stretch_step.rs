use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flv_core::{PhysicsConfig, RngHandle, WilsonCoefficients};
use flv_fit::{EnsembleSampler, FitSpec, LogPosterior, Measurement, StretchMove, Walkers};
use flv_physics::{default_parameters, Catalogue, ObservableInstance};

fn rosenbrock(x: &[f64]) -> f64 {
    -x.windows(2)
        .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
        .sum::<f64>()
        / 20.0
}

fn ensemble(n: usize, dim: usize, f: &dyn Fn(&[f64]) -> f64) -> Walkers {
    let mut rng = RngHandle::from_seed(17);
    let positions: Vec<Vec<f64>> = (0..n)
        .map(|_| (0..dim).map(|_| rng.uniform()).collect())
        .collect();
    let values = positions.iter().map(|p| f(p)).collect();
    Walkers::new(positions, values).unwrap()
}

fn bench_stretch(c: &mut Criterion) {
    let stretch = StretchMove::new(2.0, 1).unwrap();
    let walkers = ensemble(64, 8, &rosenbrock);

    let schema = default_parameters().unwrap();
    let catalogue = Catalogue::builder(PhysicsConfig::default())
        .unwrap()
        .with_ckm_observables()
        .unwrap()
        .build()
        .unwrap();
    let fit = FitSpec::new("bench")
        .with_fit_parameters(["Vus", "Vub", "Vcb", "gamma"])
        .with_measurements(["DeltaM_d", "gamma"]);
    let posterior = LogPosterior::new(
        &fit,
        Arc::new(catalogue),
        &schema,
        vec![
            Measurement::normal("DeltaM_d", ObservableInstance::new("DeltaM_d"), 0.5065, 0.0019),
            Measurement::normal("gamma", ObservableInstance::new("gamma"), 1.15, 0.07),
        ],
        WilsonCoefficients::default(),
    )
    .unwrap();
    let log_posterior = |x: &[f64]| posterior.log_posterior(x);
    let start = posterior.starting_point().to_vec();
    let ckm_walkers = {
        let mut rng = RngHandle::from_seed(3);
        let positions: Vec<Vec<f64>> = (0..16)
            .map(|_| start.iter().map(|x| x * (1.0 + 1e-3 * (rng.uniform() - 0.5))).collect())
            .collect();
        let values = positions.iter().map(|p| log_posterior(p)).collect();
        Walkers::new(positions, values).unwrap()
    };

    let mut group = c.benchmark_group("stretch_step");
    group.bench_function("rosenbrock_64x8", |b| {
        b.iter(|| stretch.advance(black_box(&walkers), &rosenbrock).unwrap())
    });
    group.bench_function("ckm_mixing_16x4", |b| {
        b.iter(|| stretch.advance(black_box(&ckm_walkers), &log_posterior).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_stretch);
criterion_main!(benches);
