/// Configuration management for the image ingest service
use crate::error::{IngestError, IngestResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default decoded image limit (5MB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Default JSON body limit (10MB), leaves room for base64 inflation
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Body bytes reserved beyond the base64 payload
const BODY_ENVELOPE_BYTES: usize = 1024;

/// Default public host for Cloud Storage objects
pub const GCS_DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub ingest: IngestConfig,
    pub storage: BlobstoreConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Paths the upload handler is mounted on
    pub upload_routes: Vec<String>,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
}

/// Ingest pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub max_image_bytes: usize,
    pub key_prefix: String,
    /// Re-encode uploads as real PNG instead of relabeling the original bytes
    pub transcode_to_png: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            key_prefix: "uploaded_images".to_string(),
            transcode_to_png: false,
        }
    }
}

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlobstoreConfig {
    Gcs(GcsConfig),
    Disk {
        location: PathBuf,
        public_base_url: String,
    },
    Memory {
        public_base_url: String,
    },
}

/// Google Cloud Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcsConfig {
    pub bucket: String,
    pub project_id: Option<String>,
    /// Service account key file; requests go unauthenticated without one
    pub credentials_path: Option<PathBuf>,
    /// JSON API endpoint, overridable for the storage emulator
    pub endpoint: String,
    pub public_base_url: String,
}

impl GcsConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            project_id: None,
            credentials_path: None,
            endpoint: GCS_DEFAULT_ENDPOINT.to_string(),
            public_base_url: GCS_DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> IngestResult<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> IngestResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let hostname = var("INGEST_HOSTNAME").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(var("INGEST_PORT").or_else(|| var("PORT")), "INGEST_PORT", 3000u16)?;

        let mut upload_routes = var("INGEST_UPLOAD_ROUTES")
            .unwrap_or_else(|| "/upload-image,/upload-images".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();
        let mut seen = HashSet::new();
        upload_routes.retain(|route| seen.insert(route.clone()));
        let request_timeout_secs = parse_or(
            var("INGEST_REQUEST_TIMEOUT_SECS"),
            "INGEST_REQUEST_TIMEOUT_SECS",
            300u64,
        )?;
        let max_body_bytes = parse_or(
            var("INGEST_MAX_BODY_BYTES"),
            "INGEST_MAX_BODY_BYTES",
            DEFAULT_MAX_BODY_BYTES,
        )?;

        let max_image_bytes = parse_or(
            var("INGEST_MAX_IMAGE_BYTES"),
            "INGEST_MAX_IMAGE_BYTES",
            DEFAULT_MAX_IMAGE_BYTES,
        )?;
        let key_prefix = var("INGEST_KEY_PREFIX")
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or_else(|| "uploaded_images".to_string());
        let transcode_to_png = parse_or(
            var("INGEST_TRANSCODE_TO_PNG"),
            "INGEST_TRANSCODE_TO_PNG",
            false,
        )?;

        // Disk and memory backends serve objects back through this service
        let local_public_base = var("INGEST_PUBLIC_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{}:{}/blob", public_host(&hostname), port));

        let bucket = var("GOOGLE_CLOUD_BUCKET_NAME");
        let backend = var("INGEST_BLOBSTORE")
            .map(|b| b.to_ascii_lowercase())
            .unwrap_or_else(|| (if bucket.is_some() { "gcs" } else { "disk" }).to_string());

        let storage = match backend.as_str() {
            "gcs" => {
                let bucket = bucket.ok_or_else(|| {
                    IngestError::Config(
                        "GOOGLE_CLOUD_BUCKET_NAME required for gcs backend".to_string(),
                    )
                })?;
                BlobstoreConfig::Gcs(GcsConfig {
                    bucket,
                    project_id: var("GOOGLE_CLOUD_PROJECT_ID"),
                    credentials_path: var("SERVICE_ACCOUNT_KEY_PATH")
                        .or_else(|| var("GOOGLE_APPLICATION_CREDENTIALS"))
                        .map(PathBuf::from),
                    endpoint: var("INGEST_GCS_ENDPOINT")
                        .map(|u| u.trim_end_matches('/').to_string())
                        .unwrap_or_else(|| GCS_DEFAULT_ENDPOINT.to_string()),
                    public_base_url: var("INGEST_GCS_PUBLIC_BASE_URL")
                        .map(|u| u.trim_end_matches('/').to_string())
                        .unwrap_or_else(|| GCS_DEFAULT_ENDPOINT.to_string()),
                })
            }
            "disk" => BlobstoreConfig::Disk {
                location: var("INGEST_BLOBSTORE_DISK_LOCATION")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data/blobs")),
                public_base_url: local_public_base,
            },
            "memory" => BlobstoreConfig::Memory {
                public_base_url: local_public_base,
            },
            other => {
                return Err(IngestError::Config(format!(
                    "Unknown INGEST_BLOBSTORE '{}' (expected gcs, disk or memory)",
                    other
                )))
            }
        };

        let level = var("RUST_LOG")
            .unwrap_or_else(|| "image_ingest=debug,tower_http=debug".to_string());
        let json = var("INGEST_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                upload_routes,
                request_timeout_secs,
                max_body_bytes,
            },
            ingest: IngestConfig {
                max_image_bytes,
                key_prefix,
                transcode_to_png,
            },
            storage,
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> IngestResult<()> {
        if self.service.hostname.is_empty() {
            return Err(IngestError::Config("Hostname cannot be empty".to_string()));
        }

        if self.service.port == 0 {
            return Err(IngestError::Config("Port cannot be 0".to_string()));
        }

        if self.service.upload_routes.is_empty() {
            return Err(IngestError::Config(
                "At least one upload route is required".to_string(),
            ));
        }

        if let Some(route) = self.service.upload_routes.iter().find(|r| !r.starts_with('/')) {
            return Err(IngestError::Config(format!(
                "Upload route must start with '/': {}",
                route
            )));
        }

        // These paths are owned by other handlers
        if let Some(route) = self
            .service
            .upload_routes
            .iter()
            .find(|r| r.as_str() == "/health" || r.starts_with("/blob/"))
        {
            return Err(IngestError::Config(format!(
                "Upload route collides with a reserved path: {}",
                route
            )));
        }

        if self.ingest.max_image_bytes == 0 {
            return Err(IngestError::Config(
                "Maximum image size must be greater than zero".to_string(),
            ));
        }

        // A body must carry the largest accepted image once base64 encoded
        let min_body_bytes = encoded_body_len(self.ingest.max_image_bytes);
        if self.service.max_body_bytes < min_body_bytes {
            return Err(IngestError::Config(format!(
                "Body limit ({} bytes) cannot carry a {} byte image; at least {} bytes are needed",
                self.service.max_body_bytes, self.ingest.max_image_bytes, min_body_bytes
            )));
        }

        let prefix = &self.ingest.key_prefix;
        if prefix.is_empty() || prefix.split('/').any(|s| s == "..") {
            return Err(IngestError::Config(format!(
                "Invalid key prefix: '{}'",
                prefix
            )));
        }

        if let BlobstoreConfig::Gcs(gcs) = &self.storage {
            if gcs.bucket.is_empty() {
                return Err(IngestError::Config("GCS bucket cannot be empty".to_string()));
            }
        }

        Ok(())
    }

    /// Socket address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.hostname, self.service.port)
    }
}

/// Request body size needed for an image of `image_bytes` bytes
///
/// Base64 length plus room for the data URL prefix, filename and JSON keys.
fn encoded_body_len(image_bytes: usize) -> usize {
    image_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(BODY_ENVELOPE_BYTES)
}

/// Parse an optional variable, falling back to a default when unset
fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> IngestResult<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| IngestError::Config(format!("Invalid value for {}: '{}'", key, raw))),
        None => Ok(default),
    }
}

fn public_host(hostname: &str) -> &str {
    if hostname == "0.0.0.0" {
        "localhost"
    } else {
        hostname
    }
}
