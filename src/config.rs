//! Configuration System
//!
//! Layered configuration: built-in defaults, the global config file, workspace config files,
//! then `VIDGEN__SECTION__KEY` environment variables.

use crate::derivation::RawSelections;
use crate::logging::LoggingConfig;
use crate::params::{AspectRatio, GenerationMode, VeoModel, VideoQuality};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::provider::ProviderSettings;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Generation provider connection
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Initial form selections
    #[serde(default)]
    pub defaults: SelectionDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values a fresh form starts with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionDefaults {
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default)]
    pub model: VeoModel,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub quality: VideoQuality,
}

impl SelectionDefaults {
    pub fn raw_selections(&self) -> RawSelections {
        RawSelections {
            mode: self.mode,
            model: self.model,
            aspect_ratio: self.aspect_ratio,
            quality: self.quality,
            ..RawSelections::default()
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Logging(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl StudioConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
