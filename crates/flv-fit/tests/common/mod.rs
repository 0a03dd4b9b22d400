#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flv_core::{FlvError, PhysicsConfig};
use flv_fit::{
    EnsembleSampler, FitSpec, InMemoryMeasurements, LogPosteriorFn, Measurement, ScanConfig,
    Walkers,
};
use flv_physics::{default_parameters, Catalogue, ObservableInstance};

pub fn ckm_catalogue() -> Arc<Catalogue> {
    let catalogue = Catalogue::builder(PhysicsConfig::default())
        .unwrap()
        .with_ckm_observables()
        .unwrap()
        .build()
        .unwrap();
    Arc::new(catalogue)
}

pub fn ckm_measurements() -> InMemoryMeasurements {
    InMemoryMeasurements::from_measurements([
        Measurement::normal("Vus 2023", ObservableInstance::new("|V_us|"), 0.2245, 0.0008),
        Measurement::normal("Vub 2023", ObservableInstance::new("|V_ub|"), 0.00382, 0.0002),
        Measurement::normal("Vcb 2023", ObservableInstance::new("|V_cb|"), 0.0410, 0.0014),
        Measurement::normal("gamma 2023", ObservableInstance::new("gamma"), 1.15, 0.07),
    ])
    .unwrap()
}

pub fn ckm_fit() -> FitSpec {
    FitSpec::new("CKM tree level")
        .with_fit_parameters(["Vus", "Vub", "Vcb", "gamma"])
        .with_measurements(["Vus 2023", "Vub 2023", "Vcb 2023", "gamma 2023"])
}

pub fn short_config(steps: usize, burnin: usize) -> ScanConfig {
    ScanConfig {
        steps,
        burnin,
        ..ScanConfig::default()
    }
}

pub fn schema() -> flv_core::ParameterSchema {
    default_parameters().unwrap()
}

/// Leaves walkers in place and counts calls.
#[derive(Default)]
pub struct CountingSampler {
    pub calls: Arc<AtomicUsize>,
}

impl EnsembleSampler for CountingSampler {
    fn advance(
        &self,
        walkers: &Walkers,
        _log_posterior: &LogPosteriorFn<'_>,
    ) -> Result<Walkers, FlvError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Walkers::from_parts(
            walkers.positions().to_vec(),
            walkers.log_posterior().to_vec(),
            vec![false; walkers.len()],
            walkers.step() + 1,
        )
    }
}
