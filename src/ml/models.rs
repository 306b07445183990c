use crate::error::{AppError, Result};
use crate::ml::regressor::{rmse, Estimator, HyperParameters, ModelType};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transform applied to the label before fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTransform {
    /// `ln(1 + y)`, inverted with `exp(x) - 1`
    Log1p,
    Identity,
}

impl TargetTransform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            TargetTransform::Log1p => value.ln_1p(),
            TargetTransform::Identity => value,
        }
    }

    pub fn invert(self, value: f64) -> f64 {
        match self {
            TargetTransform::Log1p => value.exp_m1(),
            TargetTransform::Identity => value,
        }
    }
}

/// Aligned feature matrix with its (transformed) targets
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    /// Feature matrix (n_samples × n_features), columns in reference schema order
    pub features: Array2<f64>,

    /// Targets in model space
    pub targets: Array1<f64>,

    /// Number of samples
    pub n_samples: usize,

    /// Number of features
    pub n_features: usize,
}

impl TrainingDataset {
    pub fn new(features: Array2<f64>, targets: Array1<f64>) -> Result<Self> {
        if features.nrows() != targets.len() {
            return Err(AppError::Training(format!(
                "Feature rows ({}) and targets ({}) differ",
                features.nrows(),
                targets.len()
            )));
        }
        let (n_samples, n_features) = features.dim();
        Ok(Self {
            features,
            targets,
            n_samples,
            n_features,
        })
    }

    /// Split into train and held-out partitions
    ///
    /// Rows are shuffled with a generator seeded from `seed`, so the same
    /// dataset and seed always yield the same partitions. The held-out
    /// partition takes `ceil(n * test_size)` rows.
    pub fn train_test_split(
        &self,
        test_size: f64,
        seed: u64,
    ) -> Result<(TrainingDataset, TrainingDataset)> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(AppError::Validation(format!(
                "test_size must be in (0, 1), got {test_size}"
            )));
        }

        let n_test = (self.n_samples as f64 * test_size).ceil() as usize;
        if n_test == 0 || n_test >= self.n_samples {
            return Err(AppError::InsufficientData {
                rows: self.n_samples,
                required: 2,
            });
        }

        let mut indices: Vec<usize> = (0..self.n_samples).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
        let (test_idx, train_idx) = indices.split_at(n_test);

        Ok((self.select(train_idx), self.select(test_idx)))
    }

    fn select(&self, rows: &[usize]) -> TrainingDataset {
        TrainingDataset {
            features: self.features.select(Axis(0), rows),
            targets: self.targets.select(Axis(0), rows),
            n_samples: rows.len(),
            n_features: self.n_features,
        }
    }
}

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Unique model identifier
    pub id: Uuid,

    /// Model type
    pub model_type: ModelType,

    /// Training timestamp
    pub trained_at: DateTime<Utc>,

    /// Number of training samples
    pub n_training_samples: usize,

    /// Number of features
    pub n_features: usize,
}

/// A fitted regressor together with everything needed to reproduce and apply it
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    pub metadata: ModelMetadata,
    hyperparameters: HyperParameters,
    target_transform: TargetTransform,
    feature_names: Vec<String>,
    estimator: Estimator,
}

impl TrainedModel {
    /// Fit a new model on `train`, whose targets are already in model space
    pub fn fit(
        hyperparameters: HyperParameters,
        target_transform: TargetTransform,
        feature_names: Vec<String>,
        train: &TrainingDataset,
    ) -> Result<Self> {
        if train.n_features != feature_names.len() {
            return Err(AppError::Training(format!(
                "Dataset has {} features but {} feature names were given",
                train.n_features,
                feature_names.len()
            )));
        }

        let estimator = Estimator::fit(&hyperparameters, &train.features, &train.targets)?;

        let model = Self {
            metadata: ModelMetadata {
                id: Uuid::new_v4(),
                model_type: hyperparameters.model_type(),
                trained_at: Utc::now(),
                n_training_samples: train.n_samples,
                n_features: train.n_features,
            },
            hyperparameters,
            target_transform,
            feature_names,
            estimator,
        };

        tracing::debug!(
            model_id = %model.metadata.id,
            model_type = %model.metadata.model_type,
            samples = train.n_samples,
            "Fitted model"
        );
        Ok(model)
    }

    /// Fit a candidate of the same family with the same hyperparameters
    pub fn refit(&self, train: &TrainingDataset) -> Result<Self> {
        Self::fit(
            self.hyperparameters.clone(),
            self.target_transform,
            self.feature_names.clone(),
            train,
        )
    }

    /// Predict in model (transformed) space
    pub fn predict(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        if features.ncols() != self.feature_names.len() {
            return Err(AppError::Training(format!(
                "Model expects {} features, got {}",
                self.feature_names.len(),
                features.ncols()
            )));
        }
        self.estimator.predict(features)
    }

    /// Predict in original units, inverting the target transform
    pub fn predict_amounts(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        let transform = self.target_transform;
        Ok(self.predict(features)?.mapv(|v| transform.invert(v)))
    }

    /// RMSE against `data` in model space
    pub fn score(&self, data: &TrainingDataset) -> Result<f64> {
        rmse(&data.targets, &self.predict(&data.features)?)
    }

    pub fn id(&self) -> Uuid {
        self.metadata.id
    }

    pub fn model_type(&self) -> ModelType {
        self.metadata.model_type
    }

    pub fn hyperparameters(&self) -> &HyperParameters {
        &self.hyperparameters
    }

    pub fn target_transform(&self) -> TargetTransform {
        self.target_transform
    }

    /// Ordered feature columns the model was fitted on
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| AppError::ArtifactCorrupt(e.to_string()))
    }
}

/// Outcome of a single-claim prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted ultimate claim amount in currency units
    pub predicted_amount: f64,

    /// `(predicted - estimated) / estimated * 100`; `None` when the estimate is zero
    pub variance_pct: Option<f64>,

    /// Prediction exceeds the handler's estimate
    pub requires_review: bool,

    /// Categorical values unseen by the reference schema
    pub unseen_categories: usize,
}

impl PredictionResult {
    pub fn new(predicted_amount: f64, estimated_claim: f64, unseen_categories: usize) -> Self {
        let variance_pct = (estimated_claim != 0.0)
            .then(|| (predicted_amount - estimated_claim) / estimated_claim * 100.0);
        Self {
            predicted_amount,
            variance_pct,
            requires_review: predicted_amount > estimated_claim,
            unseen_categories,
        }
    }
}

/// Outcome of one retraining run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Held-out RMSE of the production model
    pub rmse_old: f64,

    /// Held-out RMSE of the candidate
    pub rmse_new: f64,

    pub promoted: bool,

    /// Batch cells whose categorical label the production schema does not know
    #[serde(default)]
    pub unseen_categories: usize,
}

impl EvaluationResult {
    /// Strictly lower candidate RMSE promotes; ties do not
    pub fn decide(rmse_old: f64, rmse_new: f64) -> Self {
        Self {
            rmse_old,
            rmse_new,
            promoted: rmse_new < rmse_old,
            unseen_categories: 0,
        }
    }

    pub fn with_unseen_categories(mut self, count: usize) -> Self {
        self.unseen_categories = count;
        self
    }
}
