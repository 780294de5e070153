/// Unified error types for the image ingest service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the ingest service
#[derive(Error, Debug)]
pub enum IngestError {
    /// Request carried no image payload
    #[error("No base64 image data provided")]
    NoImage,

    /// Payload was not valid base64
    #[error("Invalid base64 image data")]
    InvalidBase64,

    /// Decoded payload exceeds the configured limit
    #[error("File too large. Maximum size is {}.", format_limit(.limit))]
    FileTooLarge { limit: usize },

    /// Decoded bytes are not a readable image (transcoding only)
    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    /// Request body rejected before reaching the handler
    #[error("{message}")]
    MalformedBody { status: StatusCode, message: String },

    /// Blob store rejected or failed a call
    #[error("Failed to upload image: {0}")]
    UploadFailed(String),

    /// Request did not finish within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Object not found in the blob store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::NoImage
            | IngestError::InvalidBase64
            | IngestError::FileTooLarge { .. }
            | IngestError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            IngestError::MalformedBody { status, .. } => *status,
            IngestError::NotFound(_) => StatusCode::NOT_FOUND,
            IngestError::Timeout => StatusCode::REQUEST_TIMEOUT,
            IngestError::UploadFailed(_)
            | IngestError::Config(_)
            | IngestError::Internal(_)
            | IngestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Render a byte limit the way clients see it ("5MB", "512KB", "100 bytes")
fn format_limit(limit: &usize) -> String {
    let limit = *limit;
    const MIB: usize = 1024 * 1024;
    const KIB: usize = 1024;
    if limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else if limit >= KIB && limit % KIB == 0 {
        format!("{}KB", limit / KIB)
    } else {
        format!("{} bytes", limit)
    }
}

/// Failure body returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Convert IngestError to HTTP response
impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error, message) = match &self {
            IngestError::UploadFailed(detail) => {
                tracing::error!(error = %detail, "upload_failed");
                ("Failed to upload image".to_string(), Some(detail.clone()))
            }
            IngestError::Config(_) | IngestError::Internal(_) | IngestError::Io(_) => {
                tracing::error!(error = %self, "internal_error");
                // Don't leak details
                ("Internal server error".to_string(), None)
            }
            _ => {
                tracing::warn!(status = status.as_u16(), error = %self, "request_rejected");
                (self.to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error,
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for ingest operations
pub type IngestResult<T> = Result<T, IngestError>;
