//! Failure classification
//!
//! Maps raw failure text to a user-facing category. Classification only changes the
//! displayed message and whether re-authorization runs; it never affects retry.

use serde::Serialize;

const NOT_FOUND_MARKER: &str = "Requested entity was not found.";
const INVALID_KEY_MARKER: &str = "API_KEY_INVALID";
const INVALID_KEY_PHRASES: [&str; 2] = ["api key not valid", "permission denied"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ModelOrKeyNotFound,
    InvalidOrUnauthorizedKey,
    Generic,
}

impl ErrorKind {
    /// Whether the failure should send the user back through key selection.
    pub fn requires_reauthorization(self) -> bool {
        matches!(
            self,
            ErrorKind::ModelOrKeyNotFound | ErrorKind::InvalidOrUnauthorizedKey
        )
    }
}

/// A classified failure ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
}

fn is_invalid_key(raw: &str) -> bool {
    if raw.contains(INVALID_KEY_MARKER) {
        return true;
    }
    let lower = raw.to_lowercase();
    INVALID_KEY_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Classify raw failure text. The not-found check runs first.
pub fn classify(raw: &str) -> ErrorRecord {
    let kind = if raw.contains(NOT_FOUND_MARKER) {
        ErrorKind::ModelOrKeyNotFound
    } else if is_invalid_key(raw) {
        ErrorKind::InvalidOrUnauthorizedKey
    } else {
        ErrorKind::Generic
    };

    let message = match kind {
        ErrorKind::ModelOrKeyNotFound => {
            "The model was not found, or your API key cannot access it. \
             Select an API key from a project with billing enabled and try again."
                .to_string()
        }
        ErrorKind::InvalidOrUnauthorizedKey => {
            "Your API key is invalid or lacks the required permissions. \
             Select a valid API key and try again."
                .to_string()
        }
        ErrorKind::Generic => format!("Video generation failed: {}", raw),
    };

    ErrorRecord { kind, message }
}
