//! Dashvault Artifact Store
//!
//! Provides access to the remote store holding dashboards and their
//! dependencies:
//! - Kibana HTTP client over the saved objects and dashboards APIs
//! - Mock store for testing and development
//! - Configurable provider, base URL and transient-failure retry policy

pub mod client;
pub mod mock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dashvault_artifacts::{Artifact, ArtifactType};
use dashvault_common::Config;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store configuration error: {0}")]
    Configuration(String),

    #[error("Store request error: {0}")]
    Request(String),

    #[error("Store response error: {0}")]
    Response(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnknownType(String),
}

impl From<StoreError> for dashvault_common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(cause) => dashvault_common::Error::NotFound(cause),
            StoreError::UnknownType(cause) => dashvault_common::Error::UnknownType(cause),
            other => dashvault_common::Error::Store(other.to_string()),
        }
    }
}

/// An object the store accepted during an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedObject {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
}

/// An object the store rejected during an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFailure {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
    pub message: String,
}

/// Per-object outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: Vec<ImportedObject>,
    pub failed: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.imported.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Append the outcomes of another import
    pub fn merge(&mut self, other: ImportReport) {
        self.imported.extend(other.imported);
        self.failed.extend(other.failed);
    }
}

/// Store configuration
#[derive(Clone)]
pub struct StoreConfig {
    /// Store provider (kibana, mock)
    pub provider: String,
    /// Base URL of the store
    pub base_url: String,
    /// Retries of a request answered with a server error or not answered at all
    pub max_retries: u32,
    /// Delay before the first retry, grows linearly with each attempt
    pub retry_backoff_ms: u64,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl StoreConfig {
    /// Create store config from the workspace configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            provider: config.store_provider.clone(),
            base_url: config.store_url.clone(),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Create store config from environment variables
    pub fn from_env() -> Result<Self, StoreError> {
        let config = Config::from_env().map_err(|e| StoreError::Configuration(e.to_string()))?;
        Ok(Self::from_config(&config))
    }
}

/// Artifact store trait for different backends
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Export an artifact by id.
    ///
    /// Dashboards come back as the store's export bundle (the dashboard
    /// and the objects it references); other types as a single object.
    async fn export_by_id(
        &self,
        artifact_type: ArtifactType,
        id: &str,
    ) -> Result<Vec<Artifact>, StoreError>;

    /// Export an artifact by exact title, with the same shape as `export_by_id`
    async fn export_by_title(
        &self,
        artifact_type: ArtifactType,
        title: &str,
    ) -> Result<Vec<Artifact>, StoreError>;

    /// Find a single stored object by type and id
    async fn find_by_id(
        &self,
        artifact_type: ArtifactType,
        id: &str,
    ) -> Result<Artifact, StoreError>;

    /// Import objects, overwriting existing ones on id conflict when `force` is set
    async fn import_objects(
        &self,
        objects: Vec<Artifact>,
        force: bool,
    ) -> Result<ImportReport, StoreError>;

    /// Every object in the store, of any type
    async fn find_all(&self) -> Result<Vec<Artifact>, StoreError>;
}

/// Factory for creating ArtifactStore implementations
pub struct StoreFactory;

impl StoreFactory {
    pub fn create(config: StoreConfig) -> Result<Box<dyn ArtifactStore>, StoreError> {
        match config.provider.as_str() {
            "kibana" => {
                tracing::info!(base_url = %config.base_url, "Creating Kibana store client");
                Ok(Box::new(client::KibanaClient::new(&config)?))
            }
            "mock" => {
                tracing::info!("Creating mock artifact store");
                Ok(Box::new(mock::MockArtifactStore::new()))
            }
            provider => Err(StoreError::Configuration(format!(
                "Unknown store provider: {}. Supported providers: kibana, mock",
                provider
            ))),
        }
    }
}
