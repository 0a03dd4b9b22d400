use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flv_core::{PhysicsConfig, WilsonCoefficients};
use flv_physics::{default_parameters, Catalogue};

fn bench_observables(c: &mut Criterion) {
    let catalogue = Catalogue::standard(PhysicsConfig::default()).unwrap();
    let par = default_parameters().unwrap().default_store();
    let wc = WilsonCoefficients::default();

    let mut group = c.benchmark_group("observable_eval");
    group.bench_function("dBR/dq2(B0->K*0mumu)", |b| {
        b.iter(|| {
            let _ = catalogue
                .evaluate("dBR/dq2(B0->K*0mumu)", &wc, &par, black_box(&[2.0]))
                .unwrap();
        })
    });
    group.bench_function("BR(K+->pinunu)", |b| {
        b.iter(|| {
            let _ = catalogue.evaluate("BR(K+->pinunu)", &wc, &par, &[]).unwrap();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_observables);
criterion_main!(benches);
