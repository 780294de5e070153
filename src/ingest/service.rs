/// Image ingest service
///
/// Decode → size-check → store → publish, as a single attempt per request.
/// The service holds no mutable state; concurrent requests only share the
/// blob backend.
use crate::{
    blob_store::BlobBackend,
    config::IngestConfig,
    error::{IngestError, IngestResult},
    ingest::{
        models::{StoredImage, UploadRequest, STORED_CONTENT_TYPE},
        payload,
    },
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Source of upload timestamps
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Accepts uploads and persists them to the blob backend
#[derive(Clone)]
pub struct IngestService {
    config: IngestConfig,
    backend: Arc<dyn BlobBackend>,
    clock: Arc<dyn Clock>,
}

impl IngestService {
    /// Create a new ingest service using the wall clock
    pub fn new(config: IngestConfig, backend: Arc<dyn BlobBackend>) -> Self {
        Self::with_clock(config, backend, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: IngestConfig,
        backend: Arc<dyn BlobBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            backend,
            clock,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn BlobBackend> {
        &self.backend
    }

    /// Ingest one upload
    ///
    /// Validation failures return before any backend call.
    pub async fn ingest(&self, request: UploadRequest) -> IngestResult<StoredImage> {
        let image = request
            .image
            .as_deref()
            .filter(|i| !i.is_empty())
            .ok_or(IngestError::NoImage)?;

        let payload::DecodedImage {
            bytes,
            original_format,
        } = payload::decode_image(image)?;

        // Inclusive limit: exactly max_image_bytes is accepted
        if bytes.len() > self.config.max_image_bytes {
            return Err(IngestError::FileTooLarge {
                limit: self.config.max_image_bytes,
            });
        }

        let bytes = if self.config.transcode_to_png {
            // Pixel decode and PNG encode are CPU bound
            tokio::task::spawn_blocking(move || payload::transcode_to_png(&bytes))
                .await
                .map_err(|e| IngestError::Internal(format!("Transcode task failed: {}", e)))??
        } else {
            bytes
        };

        let timestamp = self.clock.now_millis();
        let key = payload::storage_key(
            &self.config.key_prefix,
            timestamp,
            request.filename.as_deref(),
        );

        let size_bytes = bytes.len();
        let sha256 = hex::encode(Sha256::digest(&bytes));
        let dims = payload::dimensions(&bytes);

        self.backend.put(&key, bytes, STORED_CONTENT_TYPE).await?;
        self.backend.make_public(&key).await?;
        let public_url = self.backend.public_url(&key);

        tracing::info!(
            key = %key,
            size = size_bytes,
            original_format = %original_format,
            backend = self.backend.name(),
            "✅ Image uploaded (converted from {} to PNG)",
            original_format
        );

        Ok(StoredImage {
            key,
            content_type: STORED_CONTENT_TYPE.to_string(),
            size_bytes,
            public_url,
            original_format,
            sha256,
            width: dims.map(|d| d.0),
            height: dims.map(|d| d.1),
        })
    }
}
