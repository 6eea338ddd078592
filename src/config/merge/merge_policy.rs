//! Merge rules: defaults, override order, conflict handling.

use crate::provider::{DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT};
use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Environment variable prefix; nested keys use `__`, e.g. `VIDGEN__PROVIDER__ENDPOINT`.
pub const ENV_PREFIX: &str = "VIDGEN";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("provider.endpoint", DEFAULT_ENDPOINT)?
        .set_default("provider.api_key_env", DEFAULT_API_KEY_ENV)?
        .set_default("defaults.mode", "text_to_video")?
        .set_default("defaults.quality", "medium")
}

/// Environment overrides sit above every file source.
pub fn environment_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
