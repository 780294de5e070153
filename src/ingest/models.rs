/// Ingest data models
use serde::{Deserialize, Serialize};

/// Content type every stored object is labeled with
pub const STORED_CONTENT_TYPE: &str = "image/png";

/// Format reported as the conversion target
pub const CONVERTED_TYPE: &str = "png";

/// Upload request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Data URL (`data:image/<fmt>;base64,...`) or bare base64
    #[serde(default)]
    pub image: Option<String>,

    /// Optional name; only the stem is kept
    #[serde(default)]
    pub filename: Option<String>,
}

impl UploadRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// A successfully stored image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub key: String,
    pub content_type: String,
    pub size_bytes: usize,
    pub public_url: String,
    /// Format declared by the data URL prefix ("png" when absent)
    pub original_format: String,
    /// Hex SHA-256 of the stored bytes
    pub sha256: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Success body returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file_name: String,
    pub public_url: String,
    pub size: usize,
    pub original_type: String,
    pub converted_type: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl From<StoredImage> for UploadResponse {
    fn from(image: StoredImage) -> Self {
        Self {
            success: true,
            message: "Image uploaded successfully".to_string(),
            file_name: image.key,
            public_url: image.public_url,
            size: image.size_bytes,
            original_type: image.original_format,
            converted_type: CONVERTED_TYPE.to_string(),
            sha256: image.sha256,
            width: image.width,
            height: image.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_missing_and_null_fields() {
        let request: UploadRequest = serde_json::from_str("{}").unwrap();
        assert!(request.image.is_none());
        assert!(request.filename.is_none());

        let request: UploadRequest =
            serde_json::from_str(r#"{"image": null, "filename": null, "extra": 1}"#).unwrap();
        assert!(request.image.is_none());
    }

    #[test]
    fn test_response_wire_format() {
        let response = UploadResponse::from(StoredImage {
            key: "uploaded_images/1_a.png".to_string(),
            content_type: STORED_CONTENT_TYPE.to_string(),
            size_bytes: 3,
            public_url: "https://storage.googleapis.com/b/uploaded_images/1_a.png".to_string(),
            original_format: "jpeg".to_string(),
            sha256: "ab".to_string(),
            width: None,
            height: None,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Image uploaded successfully");
        assert_eq!(json["fileName"], "uploaded_images/1_a.png");
        assert_eq!(json["size"], 3);
        assert_eq!(json["originalType"], "jpeg");
        assert_eq!(json["convertedType"], "png");
        assert!(json.get("width").is_none());
    }
}
