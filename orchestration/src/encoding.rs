//! Binary ↔ `data:<mime>;base64,<payload>` conversion for uploads.

use std::path::Path;
use std::sync::LazyLock;

use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upload ceiling, checked before any bytes are encoded.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

static DATA_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(image/[a-zA-Z+]+);base64,(.+)$").expect("DATA_URI_RE regex should compile")
});

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("file is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("unsupported image type '{0}' (expected JPG, PNG or WebP)")]
    UnsupportedType(String),

    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Inline binary part as sent to the generative service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload without the `data:` prefix.
    pub data: String,
}

impl InlineData {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Split an image data URI into its MIME type and payload.
/// Anything else (non-image, not base64) is `None`.
pub fn parse_data_uri(uri: &str) -> Option<InlineData> {
    let caps = DATA_URI_RE.captures(uri.trim())?;
    Some(InlineData {
        mime_type: caps[1].to_string(),
        data: caps[2].to_string(),
    })
}

/// Encode bytes already in memory.
pub fn encode_data_uri(bytes: &[u8], mime_type: &str) -> Result<String, EncodeError> {
    check_type(mime_type)?;
    check_size(bytes.len() as u64)?;
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime_type};base64,{payload}"))
}

/// Read and encode an image file. The size is checked from metadata first,
/// so oversized files are rejected without being read.
pub async fn encode_file(path: impl AsRef<Path>) -> Result<String, EncodeError> {
    let path = path.as_ref();
    let mime_type = mime_for_path(path)
        .ok_or_else(|| EncodeError::UnsupportedType(path.display().to_string()))?;
    let size = tokio::fs::metadata(path).await?.len();
    check_size(size)?;
    let bytes = tokio::fs::read(path).await?;
    encode_data_uri(&bytes, mime_type)
}

/// MIME type from a file extension, for the accepted image types only.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn check_type(mime_type: &str) -> Result<(), EncodeError> {
    if ACCEPTED_IMAGE_TYPES.contains(&mime_type) {
        Ok(())
    } else {
        Err(EncodeError::UnsupportedType(mime_type.to_string()))
    }
}

fn check_size(size: u64) -> Result<(), EncodeError> {
    if size > MAX_UPLOAD_BYTES {
        Err(EncodeError::TooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        })
    } else {
        Ok(())
    }
}
