//! Media encoding
//!
//! Converts uploaded files (and re-packaged generation output) into base64 attachments.

use crate::error::MediaError;
use crate::params::MediaAttachment;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Image => "an image",
            MediaKind::Video => "a video",
            MediaKind::Audio => "audio",
        };
        f.write_str(name)
    }
}

impl MediaKind {
    pub fn of_mime(mime_type: &str) -> Option<MediaKind> {
        match mime_type.split('/').next() {
            Some("image") => Some(MediaKind::Image),
            Some("video") => Some(MediaKind::Video),
            Some("audio") => Some(MediaKind::Audio),
            _ => None,
        }
    }
}

/// Infer a MIME type from the file extension.
pub fn mime_for_path(path: &Path) -> Result<&'static str, MediaError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        _ => return Err(MediaError::UnsupportedType(path.display().to_string())),
    };
    Ok(mime)
}

/// Binary-to-text encoding of media before it is attached to parameters.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Read and encode a file, checking it is the expected kind of media.
    async fn encode_file(
        &self,
        path: &Path,
        expected: MediaKind,
    ) -> Result<MediaAttachment, MediaError>;

    /// Encode bytes already in memory.
    fn encode_bytes(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<MediaAttachment, MediaError>;
}

/// Standard-alphabet base64 encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64MediaEncoder;

#[async_trait]
impl MediaEncoder for Base64MediaEncoder {
    async fn encode_file(
        &self,
        path: &Path,
        expected: MediaKind,
    ) -> Result<MediaAttachment, MediaError> {
        let mime_type = mime_for_path(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let actual = MediaKind::of_mime(mime_type)
            .ok_or_else(|| MediaError::UnsupportedType(file_name.clone()))?;
        if actual != expected {
            return Err(MediaError::KindMismatch {
                name: file_name,
                expected,
                actual,
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| MediaError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(file = %file_name, bytes = bytes.len(), "Encoding media file");
        self.encode_bytes(&file_name, mime_type, &bytes)
    }

    fn encode_bytes(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<MediaAttachment, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty(file_name.to_string()));
        }
        Ok(MediaAttachment {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            base64: STANDARD.encode(bytes),
        })
    }
}
