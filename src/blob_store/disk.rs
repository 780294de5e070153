/// Disk-based blob storage backend
use crate::{
    blob_store::{encode_key, BlobBackend},
    error::{IngestError, IngestResult},
};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Disk storage backend
///
/// Stores objects on the local filesystem, mirroring the key layout:
/// key "uploaded_images/1700000000000_photo.png" -> {base}/uploaded_images/1700000000000_photo.png
#[derive(Clone)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
    public_base_url: String,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf, public_base_url: String) -> Self {
        Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the file path for a key
    ///
    /// Only plain relative segments are accepted so a key can never
    /// resolve outside the base directory.
    fn get_blob_path(&self, key: &str) -> IngestResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && !key.split('/').any(str::is_empty)
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !valid {
            return Err(IngestError::UploadFailed(format!("Invalid object key: {}", key)));
        }

        Ok(self.base_path.join(relative))
    }

    /// Ensure the directory for an object exists
    async fn ensure_blob_dir(&self, key: &str) -> IngestResult<PathBuf> {
        let blob_path = self.get_blob_path(key)?;
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                IngestError::UploadFailed(format!("Failed to create blob directory: {}", e))
            })?;
        }
        Ok(blob_path)
    }
}

#[async_trait]
impl BlobBackend for DiskBlobBackend {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> IngestResult<()> {
        let blob_path = self.ensure_blob_dir(key).await?;

        fs::write(&blob_path, data).await.map_err(|e| {
            IngestError::UploadFailed(format!("Failed to write blob {}: {}", key, e))
        })?;

        tracing::debug!(key, path = %blob_path.display(), "blob written to disk");
        Ok(())
    }

    async fn make_public(&self, key: &str) -> IngestResult<()> {
        let blob_path = self.get_blob_path(key)?;

        if !blob_path.exists() {
            return Err(IngestError::UploadFailed(format!(
                "Cannot make missing blob public: {}",
                key
            )));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&blob_path, std::fs::Permissions::from_mode(0o644))
                .await
                .map_err(|e| {
                    IngestError::UploadFailed(format!("Failed to make blob {} public: {}", key, e))
                })?;
        }

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, encode_key(key))
    }

    async fn get(&self, key: &str) -> IngestResult<Option<Vec<u8>>> {
        let blob_path = match self.get_blob_path(key) {
            Ok(path) => path,
            // A key that cannot exist on disk is simply absent
            Err(_) => return Ok(None),
        };

        match fs::read(&blob_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IngestError::Internal(format!(
                "Failed to read blob {}: {}",
                key, e
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}
