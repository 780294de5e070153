/// Google Cloud Storage blob backend
///
/// Talks to the Cloud Storage JSON API directly over HTTP. Authentication
/// uses a service account key file: a signed RS256 assertion is exchanged
/// for an OAuth access token which is cached until shortly before expiry.
use crate::{
    blob_store::{encode_key, BlobBackend},
    config::GcsConfig,
    error::{IngestError, IngestResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.full_control";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh tokens this long before they expire
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// GCS blob storage backend
#[derive(Clone)]
pub struct GcsBlobBackend {
    client: Client,
    config: GcsConfig,
    auth: Option<Arc<TokenSource>>,
}

/// Relevant fields of a service account key file
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Access token source backed by a service account
struct TokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    fn new(key: ServiceAccountKey) -> IngestResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            IngestError::Config(format!("Invalid service account private key: {}", e))
        })?;

        Ok(Self {
            key,
            encoding_key,
            cached: Mutex::new(None),
        })
    }

    /// Signed assertion for the token endpoint
    fn assertion(&self, now: DateTime<Utc>) -> IngestResult<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: STORAGE_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            IngestError::UploadFailed(format!("Failed to sign token assertion: {}", e))
        })
    }

    async fn access_token(&self, client: &Client) -> IngestResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        debug!(client_email = %self.key.client_email, "requesting storage access token");

        let assertion = self.assertion(now)?;
        let response = client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| IngestError::UploadFailed(format!("Token request failed: {}", e)))?;

        let response = check_status(response, "token exchange").await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IngestError::UploadFailed(format!("Invalid token response: {}", e)))?;

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });

        Ok(value)
    }
}

impl GcsBlobBackend {
    /// Create a new GCS blob backend
    pub async fn new(config: GcsConfig) -> IngestResult<Self> {
        info!(
            "Initializing GCS blob storage (bucket: {}, project: {})",
            config.bucket,
            config.project_id.as_deref().unwrap_or("-")
        );

        let auth = match &config.credentials_path {
            Some(path) => {
                let key = load_service_account(path).await?;
                info!(client_email = %key.client_email, "using service account credentials");
                Some(Arc::new(TokenSource::new(key)?))
            }
            None => {
                info!("No service account configured, storage requests are unauthenticated");
                None
            }
        };

        let client = Client::builder()
            .build()
            .map_err(|e| IngestError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        info!("✓ GCS blob storage initialized");

        Ok(Self {
            client,
            config,
            auth,
        })
    }

    /// Media upload URL for a key
    fn upload_url(&self, key: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.config.endpoint,
            urlencoding::encode(&self.config.bucket),
            urlencoding::encode(key)
        )
    }

    /// Object metadata URL for a key; object names are a single path segment
    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.config.endpoint,
            urlencoding::encode(&self.config.bucket),
            urlencoding::encode(key)
        )
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> IngestResult<reqwest::RequestBuilder> {
        match &self.auth {
            Some(source) => {
                let token = source.access_token(&self.client).await?;
                Ok(request.bearer_auth(token))
            }
            None => Ok(request),
        }
    }
}

async fn load_service_account(path: &Path) -> IngestResult<ServiceAccountKey> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        IngestError::Config(format!(
            "Failed to read service account key {}: {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&raw).map_err(|e| {
        IngestError::Config(format!(
            "Invalid service account key {}: {}",
            path.display(),
            e
        ))
    })
}

/// Turn a non-success response into an upload failure carrying the body
async fn check_status(
    response: reqwest::Response,
    operation: &str,
) -> IngestResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(%status, operation, "GCS request failed: {}", body);
    Err(IngestError::UploadFailed(format!(
        "GCS {} failed ({}): {}",
        operation, status, body
    )))
}

#[async_trait]
impl BlobBackend for GcsBlobBackend {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> IngestResult<()> {
        debug!(
            "Uploading blob to GCS: {} ({} bytes, type: {})",
            key,
            data.len(),
            content_type
        );

        let request = self
            .client
            .post(self.upload_url(key))
            .header(header::CONTENT_TYPE, content_type)
            .body(data);

        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| {
                error!("Failed to upload blob to GCS: {}", e);
                IngestError::UploadFailed(format!("GCS upload failed: {}", e))
            })?;
        check_status(response, "upload").await?;

        debug!("✓ Blob uploaded to GCS: {}", key);
        Ok(())
    }

    async fn make_public(&self, key: &str) -> IngestResult<()> {
        let request = self
            .client
            .post(format!("{}/acl", self.object_url(key)))
            .json(&serde_json::json!({
                "entity": "allUsers",
                "role": "READER",
            }));

        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| {
                error!("Failed to update GCS object ACL: {}", e);
                IngestError::UploadFailed(format!("GCS ACL update failed: {}", e))
            })?;
        check_status(response, "make public").await?;

        debug!("✓ Blob made public: {}", key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.public_base_url,
            self.config.bucket,
            encode_key(key)
        )
    }

    async fn get(&self, key: &str) -> IngestResult<Option<Vec<u8>>> {
        debug!("Downloading blob from GCS: {}", key);

        let request = self
            .client
            .get(self.object_url(key))
            .query(&[("alt", "media")]);

        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| IngestError::Internal(format!("GCS download failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Blob not found in GCS: {}", key);
            return Ok(None);
        }

        let response = check_status(response, "download").await?;
        let data = response
            .bytes()
            .await
            .map_err(|e| IngestError::Internal(format!("Failed to read GCS object: {}", e)))?;

        Ok(Some(data.to_vec()))
    }

    fn name(&self) -> &'static str {
        "gcs"
    }
}
