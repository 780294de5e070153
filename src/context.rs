/// Application context and dependency injection
use crate::{
    blob_store::{self, BlobBackend},
    config::ServerConfig,
    error::IngestResult,
    ingest::IngestService,
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub ingest: Arc<IngestService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> IngestResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize blob store
        let backend = blob_store::from_config(&config.storage).await?;

        Ok(Self::with_backend(config, backend))
    }

    /// Build a context around an existing backend
    pub fn with_backend(config: ServerConfig, backend: Arc<dyn BlobBackend>) -> Self {
        let ingest = Arc::new(IngestService::new(config.ingest.clone(), backend));
        Self {
            config: Arc::new(config),
            ingest,
        }
    }

    /// Build a context around an existing ingest service
    pub fn with_service(config: ServerConfig, ingest: IngestService) -> Self {
        Self {
            config: Arc::new(config),
            ingest: Arc::new(ingest),
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
