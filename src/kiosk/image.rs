use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::error::SubmitError;

/// Content type assumed when the held image does not carry one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// The single image a kiosk holds between capture and submit, kept as a
/// `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    data_url: String,
}

/// Raw bytes ready for upload.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub bytes: Bytes,
    /// May be empty when the source had no known type.
    pub content_type: String,
}

impl CapturedImage {
    pub fn from_bytes(bytes: &[u8], content_type: &str) -> Self {
        Self {
            data_url: format!("data:{content_type};base64,{}", STANDARD.encode(bytes)),
        }
    }

    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        Self {
            data_url: data_url.into(),
        }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn decode(&self) -> Result<ImageBlob, SubmitError> {
        let rest = self
            .data_url
            .strip_prefix("data:")
            .ok_or_else(|| SubmitError::InvalidImage("not a data URL".to_string()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| SubmitError::InvalidImage("data URL has no payload".to_string()))?;

        let content_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| SubmitError::InvalidImage("data URL is not base64".to_string()))?;

        let bytes = STANDARD.decode(payload)?;

        Ok(ImageBlob {
            bytes: Bytes::from(bytes),
            content_type: content_type.to_string(),
        })
    }
}

/// Guess a MIME type from a file extension. Unknown extensions yield an empty string.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("bmp") => "image/bmp",
        _ => "",
    }
}
