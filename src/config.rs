use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Retraining configuration
    #[serde(default)]
    pub retraining: RetrainingConfig,

    /// Claims data configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("FNOL_CONFIG_PATH").unwrap_or_else(|_| "config/local.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: FNOL_)
            .add_source(
                config::Environment::with_prefix("FNOL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Where `load()` reads production artifacts from
    #[serde(default)]
    pub source: ArtifactSource,

    /// Local directory holding the production slot and versioned snapshots
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Model artifact filename
    #[serde(default = "default_model_filename")]
    pub model_filename: String,

    /// Feature column artifact filename
    #[serde(default = "default_features_filename")]
    pub features_filename: String,

    /// Hub base URL
    #[serde(default = "default_hub_endpoint")]
    pub hub_endpoint: String,

    /// Hub repository ID ("org/name")
    #[serde(default = "default_repo_id")]
    pub repo_id: String,

    /// Hub revision (branch, tag or commit)
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Environment variable holding the hub token
    #[serde(default = "default_hub_token_env")]
    pub hub_token_env: String,

    /// Optional cache directory for fetched artifacts
    pub cache_dir: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            source: ArtifactSource::default(),
            models_dir: default_models_dir(),
            model_filename: default_model_filename(),
            features_filename: default_features_filename(),
            hub_endpoint: default_hub_endpoint(),
            repo_id: default_repo_id(),
            revision: default_revision(),
            hub_token_env: default_hub_token_env(),
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    #[default]
    Local,
    Hub,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainingConfig {
    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Seed for the train/held-out shuffle
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Minimum batch size accepted for retraining
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,

    /// IQR multiplier for outlier containment
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
}

impl Default for RetrainingConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            seed: default_seed(),
            min_rows: default_min_rows(),
            iqr_multiplier: default_iqr_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Claims CSV used by the overview
    #[serde(default = "default_claims_path")]
    pub claims_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            claims_path: default_claims_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

// Default value functions
fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_model_filename() -> String {
    "best_model.bin".to_string()
}

fn default_features_filename() -> String {
    "feature_columns.json".to_string()
}

fn default_hub_endpoint() -> String {
    "https://huggingface.co".to_string()
}

fn default_repo_id() -> String {
    "Bunmi01/Ultimate_claim_cost_model".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_hub_token_env() -> String {
    "HF_TOKEN".to_string()
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_min_rows() -> usize {
    10
}

fn default_iqr_multiplier() -> f64 {
    1.5
}

fn default_claims_path() -> PathBuf {
    PathBuf::from("FNOL_DATA/Claims_Policy_merged_cleaned.csv")
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.registry.source, ArtifactSource::Local);
        assert_eq!(config.registry.model_filename, "best_model.bin");
        assert_eq!(config.retraining.test_size, 0.2);
        assert_eq!(config.retraining.seed, 42);
        assert_eq!(config.retraining.min_rows, 10);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.registry.repo_id, "Bunmi01/Ultimate_claim_cost_model");
        assert_eq!(config.retraining.iqr_multiplier, 1.5);
        assert!(!config.observability.json_logs);
    }
}
