//! Model registry: production model + reference schema, plus versioned snapshots

pub mod hub;
pub mod store;

pub use hub::HubArtifactStore;
pub use store::{ArtifactStore, LocalArtifactStore};

use crate::config::{ArtifactSource, RegistryConfig};
use crate::error::{AppError, Result};
use crate::ml::encoder::FeatureSchema;
use crate::ml::models::TrainedModel;
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A versioned snapshot on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelVersion {
    pub version: u32,
    pub path: PathBuf,
}

/// Loads production artifacts from a store and writes them to a local directory
///
/// Writes go through a temporary file in the target directory followed by a
/// rename, so readers only ever see a complete artifact.
pub struct ModelRegistry {
    source: Box<dyn ArtifactStore>,
    models_dir: PathBuf,
    model_filename: String,
    features_filename: String,
}

impl ModelRegistry {
    pub fn new(
        source: Box<dyn ArtifactStore>,
        models_dir: impl Into<PathBuf>,
        model_filename: impl Into<String>,
        features_filename: impl Into<String>,
    ) -> Self {
        Self {
            source,
            models_dir: models_dir.into(),
            model_filename: model_filename.into(),
            features_filename: features_filename.into(),
        }
    }

    /// Registry that reads and writes the same local directory
    pub fn local(models_dir: impl Into<PathBuf>) -> Self {
        let defaults = RegistryConfig::default();
        let models_dir = models_dir.into();
        Self::new(
            Box::new(LocalArtifactStore::new(&models_dir)),
            models_dir,
            defaults.model_filename,
            defaults.features_filename,
        )
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let source: Box<dyn ArtifactStore> = match config.source {
            ArtifactSource::Local => Box::new(LocalArtifactStore::new(&config.models_dir)),
            ArtifactSource::Hub => Box::new(HubArtifactStore::from_config(config)?),
        };
        Ok(Self::new(
            source,
            &config.models_dir,
            &config.model_filename,
            &config.features_filename,
        ))
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn production_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_filename)
    }

    pub fn schema_path(&self) -> PathBuf {
        self.models_dir.join(&self.features_filename)
    }

    /// `best_model.bin` -> `best_model_v{n}.bin`
    pub fn version_path(&self, version: u32) -> PathBuf {
        let base = Path::new(&self.model_filename);
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.model_filename.clone());
        let name = match base.extension() {
            Some(ext) => format!("{}_v{}.{}", stem, version, ext.to_string_lossy()),
            None => format!("{}_v{}", stem, version),
        };
        self.models_dir.join(name)
    }

    /// Fetch the production model and its reference schema
    ///
    /// Artifacts already present in the local slot win over the configured
    /// source, so a promoted model is what later loads see. The source only
    /// seeds a slot that has not been written yet.
    pub fn load(&self) -> Result<(TrainedModel, FeatureSchema)> {
        let local = LocalArtifactStore::new(&self.models_dir);
        let model_store: &dyn ArtifactStore = if self.production_path().exists() {
            &local
        } else {
            self.source.as_ref()
        };
        let schema_store: &dyn ArtifactStore = if self.schema_path().exists() {
            &local
        } else {
            self.source.as_ref()
        };

        let (model, schema) = fetch_pair(
            model_store,
            schema_store,
            &self.model_filename,
            &self.features_filename,
        )?;

        tracing::info!(
            location = %model_store.location(),
            model_id = %model.id(),
            model_type = %model.model_type(),
            features = schema.len(),
            "Loaded production model"
        );
        Ok((model, schema))
    }

    /// Persist `model`
    ///
    /// Versioned saves go to the lowest unused `_v{N}` slot and never touch the
    /// production path; otherwise the production slot is replaced.
    pub fn save(&self, model: &TrainedModel, versioned: bool) -> Result<PathBuf> {
        let bytes = model.to_bytes()?;
        let path = if versioned {
            self.write_versioned(&bytes)?
        } else {
            let path = self.production_path();
            self.write_atomic(&path, &bytes)?;
            path
        };

        tracing::info!(
            path = %path.display(),
            model_id = %model.id(),
            versioned,
            sha256 = %digest(&bytes),
            "Saved model"
        );
        Ok(path)
    }

    /// Write both production artifacts to the local slot
    pub fn install(&self, model: &TrainedModel, schema: &FeatureSchema) -> Result<PathBuf> {
        check_pair(model, schema)?;
        let schema_bytes = serde_json::to_vec_pretty(schema)?;
        let schema_path = self.schema_path();
        self.write_atomic(&schema_path, &schema_bytes)?;
        tracing::info!(
            path = %schema_path.display(),
            sha256 = %digest(&schema_bytes),
            "Saved feature schema"
        );
        self.save(model, false)
    }

    /// Fetch production artifacts from `remote` and install them locally
    pub fn pull_from(&self, remote: &dyn ArtifactStore) -> Result<(TrainedModel, FeatureSchema)> {
        let (model, schema) =
            fetch_pair(remote, remote, &self.model_filename, &self.features_filename)?;
        self.install(&model, &schema)?;
        tracing::info!(location = %remote.location(), model_id = %model.id(), "Pulled production model");
        Ok((model, schema))
    }

    pub fn load_version(&self, version: u32) -> Result<TrainedModel> {
        let path = self.version_path(version);
        let bytes = std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::ArtifactNotFound(path.display().to_string()),
            _ => AppError::Io(e),
        })?;
        TrainedModel::from_bytes(&bytes)
    }

    /// Versioned snapshots present on disk, ascending
    pub fn list_versions(&self) -> Result<Vec<ModelVersion>> {
        let entries = match std::fs::read_dir(&self.models_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(version) = self.parse_version(name) {
                versions.push(ModelVersion { version, path });
            }
        }
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    fn parse_version(&self, file_name: &str) -> Option<u32> {
        let base = Path::new(&self.model_filename);
        let stem = base.file_stem()?.to_str()?;
        let rest = file_name.strip_prefix(stem)?.strip_prefix("_v")?;
        let digits = match base.extension().and_then(|e| e.to_str()) {
            Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
            None => rest,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().filter(|&v| v >= 1)
    }

    fn staged(&self, bytes: &[u8]) -> Result<NamedTempFile> {
        std::fs::create_dir_all(&self.models_dir)?;
        let mut tmp = NamedTempFile::new_in(&self.models_dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.staged(bytes)?
            .persist(path)
            .map_err(|e| AppError::Io(e.error))?;
        Ok(())
    }

    fn write_versioned(&self, bytes: &[u8]) -> Result<PathBuf> {
        let mut tmp = self.staged(bytes)?;
        let mut version = 1;
        loop {
            let path = self.version_path(version);
            if path.exists() {
                version += 1;
                continue;
            }
            match tmp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                // Lost a race for this slot
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    tmp = e.file;
                    version += 1;
                }
                Err(e) => return Err(AppError::Io(e.error)),
            }
        }
    }
}

fn fetch_pair(
    model_store: &dyn ArtifactStore,
    schema_store: &dyn ArtifactStore,
    model_name: &str,
    schema_name: &str,
) -> Result<(TrainedModel, FeatureSchema)> {
    let model_bytes = model_store.fetch(model_name)?;
    let schema_bytes = schema_store.fetch(schema_name)?;

    let model = TrainedModel::from_bytes(&model_bytes).inspect_err(|_| {
        model_store.invalidate(model_name);
    })?;
    let schema: FeatureSchema = serde_json::from_slice(&schema_bytes).map_err(|e| {
        schema_store.invalidate(schema_name);
        AppError::ArtifactCorrupt(format!("{}: {}", schema_name, e))
    })?;
    check_pair(&model, &schema)?;
    Ok((model, schema))
}

fn check_pair(model: &TrainedModel, schema: &FeatureSchema) -> Result<()> {
    if model.feature_names() != schema.columns() {
        return Err(AppError::ArtifactCorrupt(format!(
            "Model {} was fitted on {} columns but the feature schema lists {}",
            model.id(),
            model.feature_names().len(),
            schema.len()
        )));
    }
    Ok(())
}

fn digest(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    format!("{:x}", Sha256::digest(bytes))
}
