/// Model lifecycle core for ultimate claim cost prediction
///
/// This module provides:
/// - Date-derived age and delay features
/// - IQR outlier containment
/// - Categorical encoding with reference-schema alignment
/// - Regressor families and RMSE scoring
/// - Single-claim prediction
/// - Retraining with candidate-vs-production promotion

pub mod encoder;
pub mod features;
pub mod models;
pub mod outliers;
pub mod predictor;
pub mod regressor;
pub mod retrainer;

pub use encoder::{
    AlignmentReport, CategoricalEncoder, EncodedFeatureVector, EncodedFeatures, FeatureSchema,
};
pub use features::{derive_features, floor_years, DerivedFeatures};
pub use models::{
    EvaluationResult, ModelMetadata, PredictionResult, TargetTransform, TrainedModel,
    TrainingDataset,
};
pub use outliers::{contain, contain_with, IqrBounds, IQR_MULTIPLIER};
pub use predictor::Predictor;
pub use regressor::{rmse, Estimator, ForestParams, HyperParameters, ModelType, TreeParams};
pub use retrainer::{bootstrap, prepare_batch, PreparedBatch, Retrainer, LABEL_TRANSFORM};
