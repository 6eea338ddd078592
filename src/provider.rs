//! Generation Provider Abstraction
//!
//! Interfaces the lifecycle controller consumes: the remote video generation call and the
//! credential selection flow. `VeoClient` is the HTTP implementation of the former; the
//! credential providers share an `ApiKeyStore` with it.

use crate::error::ApiError;
use crate::params::{GenerationParameters, GenerationResult};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod veo;

pub use veo::VeoClient;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Provider connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key; when absent the key is read from `api_key_env`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Seconds between operation status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Polls before giving up on an operation
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_poll_attempts() -> u32 {
    60
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            api_key_env: default_api_key_env(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ProviderSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("Endpoint cannot be empty".to_string());
        }
        reqwest::Url::parse(&self.endpoint)
            .map_err(|e| format!("Invalid endpoint URL '{}': {}", self.endpoint, e))?;
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be greater than zero".to_string());
        }
        if self.max_poll_attempts == 0 {
            return Err("max_poll_attempts must be greater than zero".to_string());
        }
        if self.api_key_env.trim().is_empty() {
            return Err("api_key_env cannot be empty".to_string());
        }
        Ok(())
    }

    /// Explicit key from config, falling back to the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| read_key_from_env(&self.api_key_env))
    }
}

fn read_key_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Sink for advisory progress text reported during a generation call.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(&str) + Send + Sync>,
}

impl ProgressReporter {
    pub fn new(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, message: impl AsRef<str>) {
        (self.sink)(message.as_ref());
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressReporter")
    }
}

/// Remote video generation call
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Generate a video; fails with an error whose text describes the failure.
    async fn generate(
        &self,
        params: Arc<GenerationParameters>,
        progress: ProgressReporter,
    ) -> Result<GenerationResult, ApiError>;
}

/// Key selection / authorization flow
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn has_credential(&self) -> bool;

    /// Run the selection flow until a credential is available or the user gives up.
    async fn select_credential(&self) -> Result<(), ApiError>;

    /// Drop any cached credential after the provider rejected it.
    fn invalidate(&self) {}
}

/// Shared, replaceable API key
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    key: Arc<RwLock<Option<String>>>,
}

impl ApiKeyStore {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: Arc::new(RwLock::new(key)),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.key.read().clone()
    }

    pub fn set(&self, key: impl Into<String>) {
        *self.key.write() = Some(key.into());
    }

    pub fn clear(&self) {
        *self.key.write() = None;
    }

    pub fn is_set(&self) -> bool {
        self.key.read().is_some()
    }
}

/// Selects the key by re-reading an environment variable.
pub struct EnvCredentialProvider {
    store: ApiKeyStore,
    var_name: String,
    /// Last key the provider rejected.
    rejected: Mutex<Option<String>>,
}

impl EnvCredentialProvider {
    pub fn new(store: ApiKeyStore, var_name: impl Into<String>) -> Self {
        Self {
            store,
            var_name: var_name.into(),
            rejected: Mutex::new(None),
        }
    }

    /// Whether `key` is the one most recently invalidated.
    fn is_rejected(&self, key: &str) -> bool {
        self.rejected.lock().as_deref() == Some(key)
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    fn has_credential(&self) -> bool {
        self.store.is_set()
    }

    async fn select_credential(&self) -> Result<(), ApiError> {
        match read_key_from_env(&self.var_name) {
            Some(key) => {
                if self.is_rejected(&key) {
                    warn!(
                        var = %self.var_name,
                        "Environment still holds the rejected API key; update it and retry"
                    );
                } else {
                    info!(var = %self.var_name, "API key loaded from environment");
                }
                self.store.set(key);
                Ok(())
            }
            None => Err(ApiError::CredentialUnavailable(format!(
                "set {} to a valid API key",
                self.var_name
            ))),
        }
    }

    fn invalidate(&self) {
        debug!("Clearing cached API key");
        if let Some(key) = self.store.get() {
            *self.rejected.lock() = Some(key);
        }
        self.store.clear();
    }
}

/// Asks for the key on the terminal.
pub struct PromptCredentialProvider {
    store: ApiKeyStore,
}

impl PromptCredentialProvider {
    pub fn new(store: ApiKeyStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialProvider for PromptCredentialProvider {
    fn has_credential(&self) -> bool {
        self.store.is_set()
    }

    async fn select_credential(&self) -> Result<(), ApiError> {
        let entered = tokio::task::spawn_blocking(|| {
            dialoguer::Password::new()
                .with_prompt("API key (from a project with billing enabled)")
                .interact()
        })
        .await
        .map_err(|e| ApiError::CredentialUnavailable(format!("key prompt aborted: {}", e)))?
        .map_err(|e| ApiError::CredentialUnavailable(format!("key prompt failed: {}", e)))?;

        let key = entered.trim();
        if key.is_empty() {
            warn!("Empty API key entered");
            return Err(ApiError::CredentialUnavailable(
                "no API key entered".to_string(),
            ));
        }
        self.store.set(key);
        Ok(())
    }

    fn invalidate(&self) {
        debug!("Clearing cached API key");
        self.store.clear();
    }
}
