//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain errors to a string for CLI output, with a hint where the user can act on it.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::SubmissionBlocked(_) => {
            format!("{}\nRun `vidgen check` with the same flags to see the parameters.", e)
        }
        ApiError::CredentialUnavailable(_) => {
            format!("{}\nSet the API key variable or pass --prompt-for-key.", e)
        }
        _ => e.to_string(),
    }
}
