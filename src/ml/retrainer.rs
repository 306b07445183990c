use crate::config::RetrainingConfig;
use crate::error::{AppError, Result};
use crate::ml::encoder::{CategoricalEncoder, EncodedFeatures, FeatureSchema};
use crate::ml::features::derive_features;
use crate::ml::models::{EvaluationResult, TargetTransform, TrainedModel, TrainingDataset};
use crate::ml::outliers::contain_with;
use crate::ml::regressor::HyperParameters;
use crate::models::{ClaimRecord, OUTLIER_COLUMNS, TARGET};
use crate::registry::ModelRegistry;
use ndarray::Array1;

/// Transform applied to `Ultimate_Claim_Amount` before training and scoring
pub const LABEL_TRANSFORM: TargetTransform = TargetTransform::Log1p;

/// A labeled batch after derivation, containment, label transform and encoding
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    /// Features encoded with this batch's own vocabulary
    pub encoded: EncodedFeatures,

    /// Labels in model space, row-aligned with `encoded`
    pub labels: Array1<f64>,
}

/// Run derivation, containment, label transform, projection and encoding
///
/// The caller's records are consumed; nothing outside the batch changes.
pub fn prepare_batch(mut records: Vec<ClaimRecord>, config: &RetrainingConfig) -> Result<PreparedBatch> {
    let unlabeled = records.iter().any(|r| TARGET.get(r).is_none());
    derive_features(&mut records).map_err(|e| match e {
        AppError::SchemaMismatch { mut missing } if unlabeled => {
            missing.push(TARGET.name().to_string());
            AppError::SchemaMismatch { missing }
        }
        other => other,
    })?;
    if unlabeled {
        return Err(AppError::schema_mismatch([TARGET.name()]));
    }

    if records.len() < config.min_rows {
        return Err(AppError::InsufficientData {
            rows: records.len(),
            required: config.min_rows,
        });
    }

    for column in OUTLIER_COLUMNS {
        contain_with(&mut records, column, config.iqr_multiplier);
    }

    let labels: Array1<f64> = records
        .iter()
        .map(|r| TARGET.get(r).map(|v| LABEL_TRANSFORM.apply(v)).unwrap_or(f64::NAN))
        .collect();

    let encoded = CategoricalEncoder::new().fit_transform(&records)?;

    tracing::debug!(
        rows = encoded.n_rows(),
        columns = encoded.columns().len(),
        "Prepared training batch"
    );
    Ok(PreparedBatch { encoded, labels })
}

/// Evaluates a candidate against production on newly labeled data and promotes it if better
pub struct Retrainer<'a> {
    registry: &'a ModelRegistry,
    config: RetrainingConfig,
}

impl<'a> Retrainer<'a> {
    pub fn new(registry: &'a ModelRegistry, config: RetrainingConfig) -> Self {
        Self { registry, config }
    }

    pub fn retrain(&self, new_data: Vec<ClaimRecord>) -> Result<EvaluationResult> {
        let rows = new_data.len();
        tracing::info!(rows, "Starting retraining run");

        let batch = prepare_batch(new_data, &self.config)?;

        let (production, schema) = self.registry.load()?;
        if production.target_transform() != LABEL_TRANSFORM {
            return Err(AppError::Training(format!(
                "Production model {} uses {:?} targets; retraining scores in log1p space",
                production.id(),
                production.target_transform()
            )));
        }

        let (features, report) = schema.align(&batch.encoded);
        if !report.is_clean() {
            tracing::info!(
                unseen_values = report.unseen_values,
                "Batch contains categories the production schema does not know"
            );
        }
        let dataset = TrainingDataset::new(features, batch.labels)?;

        let (train, test) = dataset.train_test_split(self.config.test_size, self.config.seed)?;
        tracing::debug!(train = train.n_samples, test = test.n_samples, "Split batch");

        let rmse_old = production.score(&test)?;
        let candidate = production.refit(&train)?;
        let rmse_new = candidate.score(&test)?;

        let result =
            EvaluationResult::decide(rmse_old, rmse_new).with_unseen_categories(report.unseen_values);
        tracing::info!(
            rmse_old,
            rmse_new,
            promoted = result.promoted,
            production_id = %production.id(),
            candidate_id = %candidate.id(),
            "Promotion decision"
        );

        if result.promoted {
            self.registry.save(&candidate, false)?;
        } else {
            tracing::info!("Candidate discarded; production model unchanged");
        }

        Ok(result)
    }
}

/// Fit a first model on a labeled batch, producing artifacts for an empty registry
///
/// The reference schema is the batch's own encoded column list.
pub fn bootstrap(
    records: Vec<ClaimRecord>,
    hyperparameters: HyperParameters,
    config: &RetrainingConfig,
) -> Result<(TrainedModel, FeatureSchema)> {
    let batch = prepare_batch(records, config)?;
    let schema = FeatureSchema::new(batch.encoded.columns().iter().cloned());
    let dataset = TrainingDataset::new(batch.encoded.values().clone(), batch.labels)?;

    let model = TrainedModel::fit(
        hyperparameters,
        LABEL_TRANSFORM,
        schema.columns().to_vec(),
        &dataset,
    )?;
    let training_rmse = model.score(&dataset)?;

    tracing::info!(
        model_id = %model.id(),
        model_type = %model.model_type(),
        rows = dataset.n_samples,
        features = schema.len(),
        training_rmse,
        "Bootstrapped model"
    );
    Ok((model, schema))
}
