//! Integration tests for the model registry

mod common;

use fnol_triage::{
    config::{ArtifactSource, RegistryConfig, RetrainingConfig},
    ml::{FeatureSchema, HyperParameters, Retrainer, TargetTransform, TrainedModel, TrainingDataset},
    registry::{ArtifactStore, HubArtifactStore, LocalArtifactStore, ModelRegistry},
    AppError,
};
use ndarray::{Array1, Array2};
use tempfile::TempDir;

fn schema() -> FeatureSchema {
    FeatureSchema::new(["Estimated_Claim_Amount", "Vehicle_Year", "Claim_Type_Theft"])
}

fn model(target: f64) -> TrainedModel {
    let data = TrainingDataset::new(Array2::zeros((2, 3)), Array1::from_elem(2, target)).unwrap();
    TrainedModel::fit(
        HyperParameters::Baseline,
        TargetTransform::Log1p,
        schema().columns().to_vec(),
        &data,
    )
    .unwrap()
}

#[test]
fn test_n_versioned_saves_produce_n_loadable_snapshots() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::local(dir.path());
    let n = 5;

    let saved: Vec<TrainedModel> = (0..n).map(|i| model(i as f64)).collect();
    for m in &saved {
        registry.save(m, true).unwrap();
    }

    let versions = registry.list_versions().unwrap();
    assert_eq!(versions.len(), n);
    for (i, version) in versions.iter().enumerate() {
        assert_eq!(version.version, i as u32 + 1);
        assert!(version.path.ends_with(format!("best_model_v{}.bin", i + 1)));
        assert_eq!(registry.load_version(version.version).unwrap().id(), saved[i].id());
    }
    assert!(!registry.production_path().exists());
}

#[test]
fn test_snapshot_of_production_does_not_replace_it() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::local(dir.path());
    let production = model(4.0);
    registry.install(&production, &schema()).unwrap();
    let before = std::fs::read(registry.production_path()).unwrap();

    let (loaded, _) = registry.load().unwrap();
    let path = registry.save(&loaded, true).unwrap();

    assert_eq!(path, registry.version_path(1));
    assert_eq!(std::fs::read(registry.production_path()).unwrap(), before);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_missing_version_is_not_found() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::local(dir.path());

    assert!(matches!(
        registry.load_version(7),
        Err(AppError::ArtifactNotFound(_))
    ));
}

#[test]
fn test_registry_from_config_uses_configured_filenames() {
    let dir = TempDir::new().unwrap();
    let config = RegistryConfig {
        source: ArtifactSource::Local,
        models_dir: dir.path().to_path_buf(),
        model_filename: "claims_model.bin".to_string(),
        features_filename: "columns.json".to_string(),
        ..RegistryConfig::default()
    };
    let registry = ModelRegistry::from_config(&config).unwrap();

    registry.install(&model(1.0), &schema()).unwrap();

    assert!(dir.path().join("claims_model.bin").exists());
    assert!(dir.path().join("columns.json").exists());
    assert_eq!(registry.version_path(2), dir.path().join("claims_model_v2.bin"));

    let store = LocalArtifactStore::new(dir.path());
    let columns: Vec<String> = serde_json::from_slice(&store.fetch("columns.json").unwrap()).unwrap();
    assert_eq!(columns, schema().columns());
}

#[test]
fn test_schema_artifact_is_a_plain_json_array() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::local(dir.path());
    std::fs::write(registry.schema_path(), br#"["Estimated_Claim_Amount","Vehicle_Year","Claim_Type_Theft"]"#)
        .unwrap();
    std::fs::write(registry.production_path(), model(2.0).to_bytes().unwrap()).unwrap();

    let (_, loaded_schema) = registry.load().unwrap();

    assert_eq!(loaded_schema, schema());
}

#[test]
fn test_promotion_is_visible_when_source_is_remote() {
    let remote_dir = TempDir::new().unwrap();
    let local_dir = TempDir::new().unwrap();
    let label = 2500f64;
    let schema = FeatureSchema::new(["Estimated_Claim_Amount", "Vehicle_Year", "Driver_age", "License_age"]);
    let data = TrainingDataset::new(
        Array2::zeros((1, schema.len())),
        Array1::from_elem(1, label.ln_1p() + 0.5),
    )
    .unwrap();
    let stale = TrainedModel::fit(
        HyperParameters::Baseline,
        TargetTransform::Log1p,
        schema.columns().to_vec(),
        &data,
    )
    .unwrap();
    ModelRegistry::local(remote_dir.path()).install(&stale, &schema).unwrap();

    let registry = ModelRegistry::new(
        Box::new(LocalArtifactStore::new(remote_dir.path())),
        local_dir.path(),
        "best_model.bin",
        "feature_columns.json",
    );
    assert_eq!(registry.load().unwrap().0.id(), stale.id());

    let result = Retrainer::new(&registry, RetrainingConfig::default())
        .retrain(common::labeled_batch(30, |_| label))
        .unwrap();
    assert!(result.promoted);

    let (current, current_schema) = registry.load().unwrap();
    assert_ne!(current.id(), stale.id());
    assert_eq!(current_schema, schema);

    // The remote copy is never written
    let (remote_model, _) = ModelRegistry::local(remote_dir.path()).load().unwrap();
    assert_eq!(remote_model.id(), stale.id());
}

#[test]
fn test_corrupt_hub_cache_is_evicted() {
    let cache = TempDir::new().unwrap();
    let local_dir = TempDir::new().unwrap();
    let cached = cache.path().join("org--model").join("main");
    std::fs::create_dir_all(&cached).unwrap();
    std::fs::write(cached.join("best_model.bin"), &model(1.0).to_bytes().unwrap()[..10]).unwrap();
    std::fs::write(cached.join("feature_columns.json"), serde_json::to_vec(&schema()).unwrap()).unwrap();

    // Unroutable endpoint: only the cache can answer
    let hub = HubArtifactStore::new("http://127.0.0.1:9", "org/model", "main")
        .unwrap()
        .with_cache_dir(cache.path());
    let registry = ModelRegistry::new(
        Box::new(hub),
        local_dir.path(),
        "best_model.bin",
        "feature_columns.json",
    );

    assert!(matches!(registry.load(), Err(AppError::ArtifactCorrupt(_))));
    assert!(!cached.join("best_model.bin").exists());
    assert!(cached.join("feature_columns.json").exists());

    // The next load goes back to the hub instead of the broken copy
    assert!(matches!(registry.load(), Err(AppError::Network(_))));
}
