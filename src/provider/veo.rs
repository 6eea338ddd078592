//! Veo client over the Gemini long-running video API.
//!
//! Flow: submit `predictLongRunning`, poll the returned operation, then download the first
//! generated sample. Frame rate, encoding, background audio and text overlay are local
//! post-production settings and are not sent.

use super::{ApiKeyStore, ProgressReporter, ProviderSettings, VideoGenerator};
use crate::error::ApiError;
use crate::params::{
    GenerationMode, GenerationParameters, GenerationResult, MediaAttachment, ProviderVideoRef,
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_VIDEO_MIME: &str = "video/mp4";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

impl From<&MediaAttachment> for InlineImage {
    fn from(media: &MediaAttachment) -> Self {
        Self {
            bytes_base64_encoded: media.base64.clone(),
            mime_type: media.mime_type.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReferenceImage {
    image: InlineImage,
    reference_type: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct VideoUri {
    uri: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PredictInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_frame: Option<InlineImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reference_images: Vec<ReferenceImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<VideoUri>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PredictParameters {
    aspect_ratio: &'static str,
    resolution: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<u32>,
    number_of_videos: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<RemoteError>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    #[serde(default)]
    video: Option<SampleVideo>,
}

#[derive(Debug, Deserialize)]
struct SampleVideo {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

/// Build the request body for a canonical parameter set.
pub(crate) fn build_request(params: &GenerationParameters) -> PredictRequest {
    let mut instance = PredictInstance {
        prompt: params.prompt.clone(),
        ..PredictInstance::default()
    };

    match params.mode {
        GenerationMode::TextToVideo => {}
        GenerationMode::FramesToVideo => {
            instance.image = params.start_frame.as_ref().map(InlineImage::from);
            // A looping clip ends on its own first frame.
            instance.last_frame = match (&params.end_frame, params.is_looping) {
                (Some(end), _) => Some(InlineImage::from(end)),
                (None, true) => params.start_frame.as_ref().map(InlineImage::from),
                (None, false) => None,
            };
        }
        GenerationMode::ReferencesToVideo => {
            instance.reference_images = params
                .reference_images
                .iter()
                .map(|img| ReferenceImage {
                    image: img.into(),
                    reference_type: "asset",
                })
                .chain(params.style_image.iter().map(|img| ReferenceImage {
                    image: img.into(),
                    reference_type: "style",
                }))
                .collect();
        }
        GenerationMode::ExtendVideo => {
            instance.video = params.input_video_ref.as_ref().map(|r| VideoUri {
                uri: r.as_str().to_string(),
            });
        }
    }

    let duration_seconds = match params.mode {
        GenerationMode::ExtendVideo => None,
        _ => Some(params.duration_secs),
    };

    PredictRequest {
        instances: vec![instance],
        parameters: PredictParameters {
            aspect_ratio: params.aspect_ratio.as_str(),
            resolution: params.resolution.as_str(),
            duration_seconds,
            number_of_videos: 1,
        },
    }
}

/// First generated sample URI of a finished operation.
pub(crate) fn extract_video_uri(operation: &Operation) -> Result<String, ApiError> {
    if let Some(err) = &operation.error {
        return Err(remote_error(None, err));
    }
    operation
        .response
        .as_ref()
        .and_then(|r| r.generate_video_response.as_ref())
        .and_then(|r| r.generated_samples.first())
        .and_then(|s| s.video.as_ref())
        .and_then(|v| v.uri.clone())
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| {
            ApiError::EmptyResult(format!(
                "operation {} completed without a video URI",
                operation.name
            ))
        })
}

fn remote_error(status: Option<u16>, err: &RemoteError) -> ApiError {
    let detail = match &err.status {
        Some(code) => format!("{} ({})", err.message, code),
        None => err.message.clone(),
    };
    match status {
        Some(401) | Some(403) => ApiError::ProviderAuthFailed(detail),
        Some(404) => ApiError::ProviderModelNotFound(detail),
        Some(429) => ApiError::ProviderRateLimit(detail),
        Some(code) => ApiError::ProviderRequestFailed(format!("status {}: {}", code, detail)),
        None => ApiError::ProviderError(detail),
    }
}

fn map_http_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        ApiError::ProviderError(format!("HTTP error: {}", error))
    }
}

/// Turn a non-success response into an error, keeping the provider's message text.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let err = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error,
        Err(_) => RemoteError {
            message: body,
            status: None,
        },
    };
    Err(remote_error(Some(status.as_u16()), &err))
}

/// HTTP video generator
pub struct VeoClient {
    client: Client,
    endpoint: String,
    keys: ApiKeyStore,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl VeoClient {
    pub fn new(settings: &ProviderSettings, keys: ApiKeyStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            keys,
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            max_poll_attempts: settings.max_poll_attempts,
        })
    }

    fn api_key(&self) -> Result<String, ApiError> {
        self.keys
            .get()
            .ok_or_else(|| ApiError::CredentialUnavailable("no API key selected".to_string()))
    }

    async fn start_operation(
        &self,
        params: &GenerationParameters,
        key: &str,
    ) -> Result<Operation, ApiError> {
        let url = format!("{}/models/{}:predictLongRunning", self.endpoint, params.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&build_request(params))
            .send()
            .await
            .map_err(map_http_error)?;
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to parse operation: {}", e)))
    }

    async fn poll_operation(&self, name: &str, key: &str) -> Result<Operation, ApiError> {
        let url = format!("{}/{}", self.endpoint, name);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", key)
            .send()
            .await
            .map_err(map_http_error)?;
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to parse operation: {}", e)))
    }

    async fn download(&self, uri: &str, key: &str) -> Result<(Vec<u8>, String), ApiError> {
        let response = self
            .client
            .get(uri)
            .header("x-goog-api-key", key)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = check_status(response).await?;
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .unwrap_or(DEFAULT_VIDEO_MIME)
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::ProviderError(format!("Failed to read video: {}", e)))?;
        Ok((bytes.to_vec(), mime_type))
    }
}

#[async_trait]
impl VideoGenerator for VeoClient {
    async fn generate(
        &self,
        params: Arc<GenerationParameters>,
        progress: ProgressReporter,
    ) -> Result<GenerationResult, ApiError> {
        let key = self.api_key()?;
        debug!(
            frame_rate = params.frame_rate,
            encoding = %params.encoding,
            has_audio = params.background_audio.is_some(),
            has_overlay = params.text_overlay.is_some(),
            "Local output settings are not sent to the provider"
        );

        progress.report(format!("Submitting request to {}...", params.model));
        let mut operation = self.start_operation(&params, &key).await?;
        info!(operation = %operation.name, mode = %params.mode, "Generation operation started");
        progress.report("Generation started. This usually takes a few minutes.");

        let mut attempts = 0u32;
        while !operation.done {
            if attempts >= self.max_poll_attempts {
                warn!(operation = %operation.name, attempts, "Gave up polling operation");
                return Err(ApiError::ProviderRequestFailed(format!(
                    "operation {} did not finish after {} polls",
                    operation.name, attempts
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
            attempts += 1;
            progress.report(format!("Rendering video (check {})...", attempts));
            operation = self.poll_operation(&operation.name, &key).await?;
        }

        let uri = extract_video_uri(&operation)?;
        progress.report("Downloading video...");
        let (bytes, mime_type) = self.download(&uri, &key).await?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyResult(format!(
                "video at {} was empty",
                uri
            )));
        }
        info!(operation = %operation.name, bytes = bytes.len(), "Video downloaded");

        Ok(GenerationResult {
            media: bytes.into(),
            mime_type,
            video_ref: ProviderVideoRef(uri),
        })
    }
}
