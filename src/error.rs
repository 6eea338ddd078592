//! Error types for the video generation client.

use crate::media::MediaKind;
use std::path::PathBuf;
use thiserror::Error;

/// Media preparation errors
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to read media file {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Media is empty: {0}")]
    Empty(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedType(String),

    #[error("Media {name} is {actual}, expected {expected}")]
    KindMismatch {
        name: String,
        expected: MediaKind,
        actual: MediaKind,
    },
}

/// Client-level errors. The `Display` text is what the error classifier reads,
/// so provider messages are kept verbatim inside each variant.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Generation finished without a video: {0}")]
    EmptyResult(String),

    #[error("No API key available: {0}")]
    CredentialUnavailable(String),

    #[error("Submission blocked: {0}")]
    SubmissionBlocked(String),

    #[error("{0}")]
    GenerationFailed(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Media preparation failed: {0}")]
    Media(#[from] MediaError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
