use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// A registry artifact (model or feature schema) does not exist
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// A registry artifact exists but could not be deserialized
    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    /// Required input columns are absent
    #[error("Schema mismatch: missing required columns [{}]", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    /// Batch too small to split into train and held-out partitions
    #[error("Insufficient data: {rows} rows supplied, at least {required} required")]
    InsufficientData { rows: usize, required: usize },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Regressor fit or predict failures
    #[error("Training error: {0}")]
    Training(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network errors
    #[error("Network error: {0}")]
    Network(String),
}

impl AppError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::ArtifactNotFound(_) => "ARTIFACT_NOT_FOUND",
            AppError::ArtifactCorrupt(_) => "ARTIFACT_CORRUPT",
            AppError::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            AppError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Training(_) => "TRAINING_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Network(_) => "NETWORK_ERROR",
        }
    }

    pub(crate) fn schema_mismatch<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppError::SchemaMismatch {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from bincode::Error
impl From<bincode::Error> for AppError {
    fn from(err: bincode::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from csv::Error
impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
