/// Blob Storage System
///
/// Object storage for uploaded images. The ingest pipeline only needs to
/// write an object, make it publicly readable and resolve its public URL;
/// `get` exists so stored objects can be read back.
/// Supports multiple backend implementations (GCS, disk, memory)

pub mod disk;
pub mod gcs;
pub mod memory;

pub use disk::DiskBlobBackend;
pub use gcs::GcsBlobBackend;
pub use memory::MemoryBlobBackend;

use crate::{config::BlobstoreConfig, error::IngestResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Blob storage backend trait
///
/// Keys are `/`-separated object names such as
/// `uploaded_images/1700000000000_photo.png`.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Store an object under `key`
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> IngestResult<()>;

    /// Make a stored object publicly readable
    async fn make_public(&self, key: &str) -> IngestResult<()>;

    /// Public URL clients can fetch the object from
    fn public_url(&self, key: &str) -> String;

    /// Retrieve an object by key
    async fn get(&self, key: &str) -> IngestResult<Option<Vec<u8>>>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Percent-encode each `/`-separated segment of a key for use in a URL path
///
/// `/blob/*key` decodes the path back to the stored key.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the configured backend
pub async fn from_config(config: &BlobstoreConfig) -> IngestResult<Arc<dyn BlobBackend>> {
    let backend: Arc<dyn BlobBackend> = match config {
        BlobstoreConfig::Gcs(gcs) => Arc::new(GcsBlobBackend::new(gcs.clone()).await?),
        BlobstoreConfig::Disk {
            location,
            public_base_url,
        } => {
            tokio::fs::create_dir_all(location).await?;
            Arc::new(DiskBlobBackend::new(location.clone(), public_base_url.clone()))
        }
        BlobstoreConfig::Memory { public_base_url } => {
            Arc::new(MemoryBlobBackend::new(public_base_url.clone()))
        }
    };

    tracing::info!(backend = backend.name(), "blob storage initialized");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_encode_key_keeps_separators() {
        assert_eq!(
            encode_key("uploaded_images/1_lost wallet.png"),
            "uploaded_images/1_lost%20wallet.png"
        );
        assert_eq!(
            encode_key("uploaded_images/1_lost#1?.png"),
            "uploaded_images/1_lost%231%3F.png"
        );
        assert_eq!(encode_key("uploaded_images/1_50%off.png"), "uploaded_images/1_50%25off.png");
        assert_eq!(encode_key("uploaded_images/1_a.png"), "uploaded_images/1_a.png");
    }

    #[tokio::test]
    async fn test_from_config_disk_creates_directory() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("nested").join("blobs");
        let config = BlobstoreConfig::Disk {
            location: location.clone(),
            public_base_url: "http://localhost:3000/blob".to_string(),
        };

        let backend = from_config(&config).await.unwrap();
        assert_eq!(backend.name(), "disk");
        assert!(location.is_dir());
    }

    #[tokio::test]
    async fn test_from_config_memory() {
        let config = BlobstoreConfig::Memory {
            public_base_url: "http://localhost:3000/blob".to_string(),
        };

        let backend = from_config(&config).await.unwrap();
        assert_eq!(backend.name(), "memory");
        assert_eq!(
            backend.public_url("uploaded_images/1_a.png"),
            "http://localhost:3000/blob/uploaded_images/1_a.png"
        );
    }
}
