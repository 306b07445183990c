//! End-to-end tests for the model lifecycle: bootstrap, predict, retrain, promote

mod common;

use common::{labeled_batch, write_csv};
use fnol_triage::{
    config::RetrainingConfig,
    data::load_training_batch,
    ml::{
        bootstrap, FeatureSchema, HyperParameters, Predictor, Retrainer, TargetTransform,
        TrainedModel, TrainingDataset, TreeParams,
    },
    models::ClaimRecord,
    registry::ModelRegistry,
    AppError,
};
use ndarray::{Array1, Array2};
use tempfile::TempDir;

fn tree() -> HyperParameters {
    HyperParameters::DecisionTree(TreeParams {
        max_depth: Some(6),
        min_samples_leaf: 1,
        min_samples_split: 2,
    })
}

#[test]
fn test_constant_model_prediction_round_trips_through_registry() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::local(dir.path());
    let schema = FeatureSchema::new([
        "Estimated_Claim_Amount",
        "Vehicle_Year",
        "Driver_age",
        "License_age",
        "Claim_Type_Collision",
        "Weather_Condition_Rain",
    ]);
    let data = TrainingDataset::new(
        Array2::zeros((2, schema.len())),
        Array1::from_elem(2, 1000f64.ln_1p()),
    )
    .unwrap();
    let model = TrainedModel::fit(
        HyperParameters::Baseline,
        TargetTransform::Log1p,
        schema.columns().to_vec(),
        &data,
    )
    .unwrap();
    registry.install(&model, &schema).unwrap();

    let (loaded, loaded_schema) = registry.load().unwrap();
    let predictor = Predictor::new(loaded, loaded_schema).unwrap();
    let claim = ClaimRecord::new("Collision", "Heavy", "Rain", "SUV", 1000.0, 2018.0)
        .with_ages(35.0, 12.0);
    let result = predictor.predict(&claim).unwrap();

    assert!((result.predicted_amount - 1000.0).abs() < 1e-6);
    assert!(result.variance_pct.unwrap().abs() < 1e-6);
    // Traffic_Condition_Heavy and Vehicle_Type_SUV are not in the schema
    assert_eq!(result.unseen_categories, 2);
}

#[test]
fn test_bootstrap_from_csv_then_predict() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("claims.csv");
    write_csv(&csv_path, &labeled_batch(60, |est| est * 1.2));
    let registry = ModelRegistry::local(dir.path().join("models"));

    let batch = load_training_batch(&csv_path).unwrap();
    let (model, schema) = bootstrap(batch, tree(), &RetrainingConfig::default()).unwrap();
    registry.install(&model, &schema).unwrap();

    let (loaded, loaded_schema) = registry.load().unwrap();
    assert_eq!(loaded.id(), model.id());
    let predictor = Predictor::new(loaded, loaded_schema).unwrap();
    let claim = ClaimRecord::new("Theft", "Light", "Clear", "Sedan", 1000.0, 2012.0)
        .with_ages(40.0, 15.0);
    let result = predictor.predict(&claim).unwrap();

    assert!(result.predicted_amount > 0.0);
    assert_eq!(result.unseen_categories, 0);
    assert!(result.variance_pct.is_some());
}

#[test]
fn test_retrain_promotes_candidate_over_stale_model() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::local(dir.path());
    let config = RetrainingConfig::default();

    // Production learned from claims that settled at three times today's level
    let (stale, schema) = bootstrap(labeled_batch(60, |est| est * 3.3), tree(), &config).unwrap();
    registry.install(&stale, &schema).unwrap();

    let result = Retrainer::new(&registry, config)
        .retrain(labeled_batch(60, |est| est * 1.1))
        .unwrap();

    assert!(result.promoted);
    assert!(result.rmse_new < result.rmse_old);
    assert!(result.rmse_old > 0.9);

    let (promoted, promoted_schema) = registry.load().unwrap();
    assert_ne!(promoted.id(), stale.id());
    assert_eq!(promoted.hyperparameters(), stale.hyperparameters());
    assert_eq!(promoted_schema, schema);
    assert_eq!(promoted.metadata.n_training_samples, 48);
}

#[test]
fn test_retrain_keeps_production_when_candidate_is_no_better() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::local(dir.path());
    let config = RetrainingConfig::default();
    let label = 2500f64;

    let schema = FeatureSchema::new(["Estimated_Claim_Amount", "Vehicle_Year", "Driver_age", "License_age"]);
    let data = TrainingDataset::new(
        Array2::zeros((1, schema.len())),
        Array1::from_elem(1, label.ln_1p()),
    )
    .unwrap();
    let production = TrainedModel::fit(
        HyperParameters::Baseline,
        TargetTransform::Log1p,
        schema.columns().to_vec(),
        &data,
    )
    .unwrap();
    registry.install(&production, &schema).unwrap();

    let result = Retrainer::new(&registry, config)
        .retrain(labeled_batch(30, |_| label))
        .unwrap();

    assert!(!result.promoted);
    assert_eq!(result.rmse_old, 0.0);
    assert_eq!(registry.load().unwrap().0.id(), production.id());
}

#[test]
fn test_retrain_rejects_small_batches() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::local(dir.path());
    let (model, schema) =
        bootstrap(labeled_batch(20, |est| est), HyperParameters::Baseline, &RetrainingConfig::default())
            .unwrap();
    registry.install(&model, &schema).unwrap();

    let err = Retrainer::new(&registry, RetrainingConfig::default())
        .retrain(labeled_batch(5, |est| est))
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientData { rows: 5, required: 10 }));
    assert_eq!(registry.load().unwrap().0.id(), model.id());
}

#[test]
fn test_training_csv_without_dates_is_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("partial.csv");
    std::fs::write(
        &csv_path,
        "Claim_Type,Traffic_Condition,Weather_Condition,Vehicle_Type,Estimated_Claim_Amount,Vehicle_Year,Ultimate_Claim_Amount\n\
         Collision,Heavy,Rain,SUV,1000,2018,1200\n",
    )
    .unwrap();

    match load_training_batch(&csv_path).unwrap_err() {
        AppError::SchemaMismatch { missing } => {
            assert_eq!(
                missing,
                vec![
                    "Accident_Date",
                    "Date_of_Birth",
                    "Full_License_issue_Date",
                    "FNOL_Date",
                    "Settlement_Date"
                ]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}
