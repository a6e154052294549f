use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Media types the extraction layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Png,
    Jpeg,
    Jpg,
    Unsupported,
}

impl MediaType {
    /// Resolves the media type of an upload. A declared MIME type naming a
    /// supported format wins; otherwise the file extension decides.
    pub fn detect(content_type: Option<&str>, file_name: &str) -> Self {
        content_type
            .map(Self::from_mime)
            .filter(|m| *m != MediaType::Unsupported)
            .unwrap_or_else(|| Self::from_file_name(file_name))
    }

    pub fn from_mime(content_type: &str) -> Self {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_lowercase();
        match normalized.as_str() {
            "application/pdf" => MediaType::Pdf,
            "image/png" => MediaType::Png,
            "image/jpeg" => MediaType::Jpeg,
            "image/jpg" => MediaType::Jpg,
            _ => MediaType::Unsupported,
        }
    }

    pub fn from_file_name(file_name: &str) -> Self {
        let Some((_, extension)) = file_name.rsplit_once('.') else {
            return MediaType::Unsupported;
        };
        match extension.to_lowercase().as_str() {
            "pdf" => MediaType::Pdf,
            "png" => MediaType::Png,
            "jpeg" => MediaType::Jpeg,
            "jpg" => MediaType::Jpg,
            _ => MediaType::Unsupported,
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, MediaType::Png | MediaType::Jpeg | MediaType::Jpg)
    }

    /// Canonical MIME string reported as `file_type` in summaries.
    pub fn as_mime(self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Jpg => "image/jpg",
            MediaType::Unsupported => "unsupported",
        }
    }

    /// File suffix used when the payload is staged on disk for the OCR tool.
    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Png => "png",
            MediaType::Jpeg => "jpeg",
            MediaType::Jpg => "jpg",
            MediaType::Unsupported => "bin",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// One uploaded file. Lives only for the duration of a request and is never persisted.
#[derive(Clone)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: MediaType,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: MediaType, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes: bytes.into(),
        }
    }
}

// Payload bytes are deliberately left out of debug output.
impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}
