use crate::error::{AppError, Result};
use crate::ml::encoder::FeatureSchema;
use crate::ml::models::{PredictionResult, TrainedModel};
use crate::models::{ClaimRecord, PredictionRequest};

/// Applies the production model to single claims
///
/// Holds the model and its reference schema as loaded by the caller; nothing
/// is cached beyond the lifetime of this value.
#[derive(Debug)]
pub struct Predictor {
    model: TrainedModel,
    schema: FeatureSchema,
}

impl Predictor {
    /// Pair a model with its reference schema
    ///
    /// Fails with `ArtifactCorrupt` if the schema is not the model's own
    /// ordered feature list.
    pub fn new(model: TrainedModel, schema: FeatureSchema) -> Result<Self> {
        if model.feature_names() != schema.columns() {
            return Err(AppError::ArtifactCorrupt(format!(
                "Feature schema ({} columns) does not match the {} columns model {} was fitted on",
                schema.len(),
                model.feature_names().len(),
                model.id()
            )));
        }
        Ok(Self { model, schema })
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Predict the ultimate amount for one claim
    pub fn predict(&self, claim: &ClaimRecord) -> Result<PredictionResult> {
        let (features, report) = self.schema.encode_record(claim)?;
        let amounts = self.model.predict_amounts(&features)?;
        let predicted = amounts
            .first()
            .copied()
            .ok_or_else(|| AppError::Training("Model returned no prediction".to_string()))?;

        let result = PredictionResult::new(predicted, claim.estimated_claim_amount, report.unseen_values);

        tracing::info!(
            model_id = %self.model.id(),
            predicted_amount = result.predicted_amount,
            variance_pct = ?result.variance_pct,
            unseen_categories = result.unseen_categories,
            "Predicted ultimate claim amount"
        );
        Ok(result)
    }

    /// Validate a handler's request, then predict
    pub fn predict_request(&self, request: PredictionRequest) -> Result<PredictionResult> {
        let claim = request.into_record()?;
        self.predict(&claim)
    }
}
