use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};

/// Read-only source of named model artifacts
pub trait ArtifactStore: Send + Sync {
    /// Fetch the raw bytes of one artifact
    fn fetch(&self, name: &str) -> Result<Vec<u8>>;

    /// Human-readable location, for logs
    fn location(&self) -> String;

    /// Drop any cached copy of `name` after it failed to deserialize
    ///
    /// Stores without a cache keep their files untouched.
    fn invalidate(&self, _name: &str) {}
}

/// Artifacts stored as plain files in one directory
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_of(name);
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::ArtifactNotFound(path.display().to_string()),
            _ => AppError::Io(e),
        })
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
