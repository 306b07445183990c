use crate::config::RegistryConfig;
use crate::error::{AppError, Result};
use crate::registry::store::ArtifactStore;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Artifacts served by a model hub over HTTP
///
/// Files are addressed as `{endpoint}/{repo_id}/resolve/{revision}/{name}`.
/// Requests block until the hub answers; callers own any timeout policy.
#[derive(Debug, Clone)]
pub struct HubArtifactStore {
    client: Client,
    endpoint: String,
    repo_id: String,
    revision: String,
    token: Option<String>,
    cache_dir: Option<PathBuf>,
}

impl HubArtifactStore {
    pub fn new(
        endpoint: impl Into<String>,
        repo_id: impl Into<String>,
        revision: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("fnol-triage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            repo_id: repo_id.into(),
            revision: revision.into(),
            token: None,
            cache_dir: None,
        })
    }

    /// Build from registry settings, reading the token from `hub_token_env`
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let mut store = Self::new(&config.hub_endpoint, &config.repo_id, &config.revision)?;
        store.token = std::env::var(&config.hub_token_env)
            .ok()
            .filter(|t| !t.is_empty());
        store.cache_dir = config.cache_dir.clone();
        Ok(store)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    pub fn artifact_url(&self, name: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.endpoint, self.repo_id, self.revision, name
        )
    }

    fn cache_path(&self, name: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| {
            dir.join(self.repo_id.replace('/', "--"))
                .join(&self.revision)
                .join(name)
        })
    }

    fn download(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.artifact_url(name);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| AppError::Network(format!("Failed to fetch {}: {}", url, e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(AppError::ArtifactNotFound(url)),
            status => {
                return Err(AppError::Network(format!(
                    "Hub returned {} for {}",
                    status, url
                )))
            }
        }

        let bytes = response
            .bytes()
            .map_err(|e| AppError::Network(format!("Failed to read {}: {}", url, e)))?;

        tracing::info!(url = %url, bytes = bytes.len(), "Fetched artifact from hub");
        Ok(bytes.to_vec())
    }
}

impl ArtifactStore for HubArtifactStore {
    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        if let Some(path) = self.cache_path(name) {
            if let Ok(bytes) = std::fs::read(&path) {
                tracing::debug!(path = %path.display(), "Using cached hub artifact");
                return Ok(bytes);
            }
        }

        let bytes = self.download(name)?;

        if let Some(path) = self.cache_path(name) {
            write_cache(&path, &bytes)?;
        }
        Ok(bytes)
    }

    fn location(&self) -> String {
        format!("{}/{}@{}", self.endpoint, self.repo_id, self.revision)
    }

    fn invalidate(&self, name: &str) {
        let Some(path) = self.cache_path(name) else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::warn!(path = %path.display(), "Evicted unreadable cached artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to evict cached artifact"),
        }
    }
}

/// Stage `bytes` next to `path` and rename into place
fn write_cache(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| AppError::Configuration(format!("Invalid cache path {}", path.display())))?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AppError::Io(e.error))?;
    Ok(())
}
