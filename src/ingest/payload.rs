/// Payload decoding and storage key derivation
use crate::error::{IngestError, IngestResult};
use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig},
        DecodePaddingMode,
    },
    Engine,
};
use image::ImageFormat;
use std::borrow::Cow;
use std::io::Cursor;

/// Standard alphabet, padding optional
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const DATA_URL_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// Format reported when the payload carries no data URL prefix
pub const DEFAULT_FORMAT: &str = "png";

/// Decoded upload payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub original_format: String,
}

/// Split `data:image/<fmt>;base64,<payload>` into its format and payload
///
/// Returns `None` for the format when the input is not a well-formed image
/// data URL, in which case the whole input is the payload.
pub fn split_data_url(input: &str) -> (Option<&str>, &str) {
    let Some(rest) = input.strip_prefix(DATA_URL_PREFIX) else {
        return (None, input);
    };
    let Some(marker) = rest.find(BASE64_MARKER) else {
        return (None, input);
    };

    let format = &rest[..marker];
    let valid = !format.is_empty()
        && format
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'));

    if valid {
        (Some(format), &rest[marker + BASE64_MARKER.len()..])
    } else {
        (None, input)
    }
}

/// Decode an image payload given as a data URL or bare base64
pub fn decode_image(input: &str) -> IngestResult<DecodedImage> {
    if input.is_empty() {
        return Err(IngestError::NoImage);
    }

    let (format, payload) = split_data_url(input);

    // Wrapped base64 (MIME style line breaks) is common in pasted payloads
    let payload: Cow<str> = if payload.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(payload.chars().filter(|c| !c.is_ascii_whitespace()).collect())
    } else {
        Cow::Borrowed(payload)
    };

    let bytes = PAYLOAD_ENGINE
        .decode(payload.as_bytes())
        .map_err(|_| IngestError::InvalidBase64)?;

    if bytes.is_empty() {
        return Err(IngestError::NoImage);
    }

    Ok(DecodedImage {
        bytes,
        original_format: format.unwrap_or(DEFAULT_FORMAT).to_string(),
    })
}

/// Human-readable stem of a client filename
///
/// Drops the last extension and neutralizes path separators and control
/// characters. Returns `None` when nothing usable is left.
pub fn filename_stem(filename: &str) -> Option<String> {
    let stem = match filename.rfind('.') {
        Some(idx) if idx + 1 < filename.len() && !filename[idx + 1..].contains('/') => {
            &filename[..idx]
        }
        _ => filename,
    };

    if stem.is_empty() {
        return None;
    }

    Some(
        stem.chars()
            .map(|c| {
                if c == '/' || c == '\\' || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect(),
    )
}

/// Storage key: `<prefix>/<millis>_<stem>.png`
pub fn storage_key(prefix: &str, timestamp_millis: i64, filename: Option<&str>) -> String {
    let stem = filename
        .and_then(filename_stem)
        .unwrap_or_else(|| format!("image_{}", timestamp_millis));

    format!("{}/{}_{}.png", prefix, timestamp_millis, stem)
}

/// Pixel dimensions read from the image header, if recognizable
pub fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Decode any supported image format and re-encode it as PNG
pub fn transcode_to_png(bytes: &[u8]) -> IngestResult<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| IngestError::InvalidImage(e.to_string()))?;

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| IngestError::Internal(format!("Failed to encode PNG: {}", e)))?;

    Ok(buf)
}
