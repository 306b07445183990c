pub mod claim;

pub use claim::{
    retraining_columns, CategoricalColumn, ClaimRecord, DateColumn, IncidentDates,
    NumericColumn, PredictionRequest, CATEGORICAL_FEATURES, NUMERIC_FEATURES, OUTLIER_COLUMNS,
    TARGET,
};
