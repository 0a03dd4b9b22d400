mod common;

use std::sync::Arc;

use common::{ckm_catalogue, ckm_fit, ckm_measurements, schema, short_config};
use flv_core::FlvError;
use flv_fit::{EnsembleScan, FitResult, RunManifest};

#[test]
fn completed_scan_is_stored_under_the_fit_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = short_config(80, 20);
    config.output.run_directory = Some(dir.path().to_path_buf());
    config.seed_policy.label = Some("storage".into());
    let mut scan = EnsembleScan::new(
        ckm_fit(),
        config,
        ckm_catalogue(),
        schema(),
        Arc::new(ckm_measurements()),
    );
    let in_memory = scan.run().unwrap().clone();

    let path = dir.path().join("CKM_tree_level.json");
    let loaded = FitResult::load(&path).unwrap();
    assert_eq!(loaded, in_memory);
    assert_eq!(loaded.chain.len(), 8 * 60);
    assert_eq!(loaded.provenance.input_hash.len(), 64);

    let manifest = RunManifest::load(&dir.path().join("manifest.json")).unwrap();
    assert_eq!(manifest.fit_name, "CKM tree level");
    assert_eq!(manifest.result_file, std::path::PathBuf::from("CKM_tree_level.json"));
    assert_eq!(manifest.seed_label.as_deref(), Some("storage"));
    assert_eq!(manifest.n_samples, 480);

    let diagnostics = loaded.diagnostics().unwrap();
    assert_eq!(diagnostics, in_memory.diagnostics().unwrap());
    assert_eq!(diagnostics.acceptance.len(), 8);
    let vus = diagnostics.parameter("Vus").unwrap();
    assert!(vus.q16 <= vus.median && vus.median <= vus.q84);
}

#[test]
fn explicit_save_honours_the_result_file_override() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = short_config(30, 5);
    config.output.result_file = Some("ckm.json".into());
    let mut scan = EnsembleScan::new(
        ckm_fit(),
        config,
        ckm_catalogue(),
        schema(),
        Arc::new(ckm_measurements()),
    );
    assert!(scan.save_result(dir.path()).is_err());
    scan.run().unwrap();
    let path = scan.save_result(dir.path()).unwrap();
    assert_eq!(path, dir.path().join("ckm.json"));
    assert!(FitResult::load(&path).is_ok());
}

#[test]
fn loading_a_missing_result_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    let err = FitResult::load(&missing).unwrap_err();
    assert!(matches!(err, FlvError::Serde(_)));
    assert_eq!(err.info().code, "result-read");
    assert_eq!(err.info().context["path"], missing.display().to_string());
}
