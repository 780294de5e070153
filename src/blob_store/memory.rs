/// In-memory blob storage backend
use crate::{
    blob_store::{encode_key, BlobBackend},
    error::{IngestError, IngestResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Object held by the memory backend
#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub public: bool,
}

/// Memory storage backend
///
/// Objects live for the lifetime of the process. Clones share storage.
/// `get` only returns objects that have been made public.
#[derive(Clone, Default)]
pub struct MemoryBlobBackend {
    objects: Arc<RwLock<HashMap<String, MemoryObject>>>,
    public_base_url: String,
}

impl MemoryBlobBackend {
    pub fn new(public_base_url: String) -> Self {
        Self {
            objects: Arc::default(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up an object with its metadata
    pub async fn object(&self, key: &str) -> Option<MemoryObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> IngestResult<()> {
        self.objects.write().await.insert(
            key.to_string(),
            MemoryObject {
                data,
                content_type: content_type.to_string(),
                public: false,
            },
        );
        Ok(())
    }

    async fn make_public(&self, key: &str) -> IngestResult<()> {
        match self.objects.write().await.get_mut(key) {
            Some(object) => {
                object.public = true;
                Ok(())
            }
            None => Err(IngestError::UploadFailed(format!(
                "No such object: {}",
                key
            ))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, encode_key(key))
    }

    async fn get(&self, key: &str) -> IngestResult<Option<Vec<u8>>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .filter(|o| o.public)
            .map(|o| o.data.clone()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
