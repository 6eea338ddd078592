//! Generation Lifecycle
//!
//! `LifecycleController` is the only authority over the Idle / Loading / Success / Error
//! phase. It accepts at most one in-flight generation: every submission takes a fresh
//! request token, and an outcome or progress message is applied only while its token is
//! still current and the phase is still `Loading`. Navigating away (reset, retry-from-error,
//! extend) bumps the token, which is how a late result gets ignored.
//!
//! State changes are published as `LifecycleSnapshot`s on a watch channel.

use crate::classifier::{classify, ErrorKind, ErrorRecord};
use crate::error::ApiError;
use crate::media::MediaEncoder;
use crate::params::{
    GenerationMode, GenerationParameters, GenerationResult, Resolution, VideoQuality,
};
use crate::provider::{CredentialProvider, ProgressReporter, VideoGenerator};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const INITIAL_PROGRESS: &str = "Initializing video generation...";
const AWAITING_KEY_PROGRESS: &str = "Waiting for API key selection...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Observable controller state.
#[derive(Debug, Clone, Default)]
pub struct LifecycleSnapshot {
    pub phase: LifecyclePhase,
    pub progress_message: Option<String>,
    pub error: Option<ErrorRecord>,
    pub result: Option<GenerationResult>,
    pub pending_seed: Option<Arc<GenerationParameters>>,
    pub last_parameters: Option<Arc<GenerationParameters>>,
    pub reauthorization_required: bool,
}

/// How a submission ended, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded,
    Failed(ErrorKind),
    /// A generation was already in flight, or there was nothing to retry.
    Rejected,
    /// The controller moved on before the outcome arrived; it was discarded.
    Superseded,
}

struct ControllerState {
    snapshot: LifecycleSnapshot,
    request_token: u64,
    /// A credential selection flow is running; new submissions wait for it.
    selecting_credential: bool,
}

struct Shared {
    state: Mutex<ControllerState>,
    events: watch::Sender<LifecycleSnapshot>,
}

impl Shared {
    fn publish(&self, state: &ControllerState) {
        self.events.send_replace(state.snapshot.clone());
    }

    fn is_current(&self, token: u64) -> bool {
        let state = self.state.lock();
        state.request_token == token && state.snapshot.phase == LifecyclePhase::Loading
    }

    /// Run `apply` only if `token` still owns the in-flight request.
    fn with_current<R>(
        &self,
        token: u64,
        apply: impl FnOnce(&mut ControllerState) -> R,
    ) -> Option<R> {
        let mut state = self.state.lock();
        if state.request_token != token || state.snapshot.phase != LifecyclePhase::Loading {
            return None;
        }
        let out = apply(&mut *state);
        self.publish(&state);
        Some(out)
    }

    /// Clear the selection flag, and the re-authorization flag if a key was chosen.
    fn end_selection(&self, authorized: bool) {
        let mut state = self.state.lock();
        state.selecting_credential = false;
        if authorized && state.snapshot.reauthorization_required {
            state.snapshot.reauthorization_required = false;
            self.publish(&state);
        }
    }
}

/// Owns the `selecting_credential` flag for one selection flow. Dropping it without
/// `finish` (a cancelled submission) releases the flag.
struct SelectionGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl<'a> SelectionGuard<'a> {
    /// Take over a flag already set under the state lock.
    fn adopt(shared: &'a Shared) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    fn finish(mut self, authorized: bool) {
        self.armed = false;
        self.shared.end_selection(authorized);
    }
}

impl Drop for SelectionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.end_selection(false);
        }
    }
}

pub struct LifecycleController {
    shared: Arc<Shared>,
    generator: Arc<dyn VideoGenerator>,
    encoder: Arc<dyn MediaEncoder>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl LifecycleController {
    pub fn new(generator: Arc<dyn VideoGenerator>, encoder: Arc<dyn MediaEncoder>) -> Self {
        let (events, _) = watch::channel(LifecycleSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ControllerState {
                    snapshot: LifecycleSnapshot::default(),
                    request_token: 0,
                    selecting_credential: false,
                }),
                events,
            }),
            generator,
            encoder,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.shared.state.lock().snapshot.phase
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        self.shared.state.lock().snapshot.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleSnapshot> {
        self.shared.events.subscribe()
    }

    /// Submit a canonical parameter set. Ignored while a generation is in flight.
    pub async fn submit(&self, params: GenerationParameters) -> SubmitOutcome {
        self.submit_shared(Arc::new(params)).await
    }

    /// Resubmit the last accepted parameters unchanged.
    pub async fn retry(&self) -> SubmitOutcome {
        let last = self.shared.state.lock().snapshot.last_parameters.clone();
        match last {
            Some(params) => self.submit_shared(params).await,
            None => {
                debug!("Retry requested with no previous submission");
                SubmitOutcome::Rejected
            }
        }
    }

    async fn submit_shared(&self, params: Arc<GenerationParameters>) -> SubmitOutcome {
        let token = {
            let mut state = self.shared.state.lock();
            if state.snapshot.phase == LifecyclePhase::Loading {
                debug!(
                    token = state.request_token,
                    "Submission ignored: generation already in flight"
                );
                return SubmitOutcome::Rejected;
            }
            if state.selecting_credential {
                debug!("Submission ignored: key selection in progress");
                return SubmitOutcome::Rejected;
            }
            state.request_token += 1;
            let snap = &mut state.snapshot;
            snap.phase = LifecyclePhase::Loading;
            snap.error = None;
            snap.result = None;
            snap.pending_seed = None;
            snap.last_parameters = Some(params.clone());
            snap.progress_message = Some(INITIAL_PROGRESS.to_string());
            self.shared.publish(&state);
            state.request_token
        };
        info!(token, mode = %params.mode, model = %params.model, "Generation submitted");

        if let Err(err) = self.ensure_credential(token).await {
            return self.settle_failure(token, err).await;
        }
        if !self.shared.is_current(token) {
            debug!(token, "Request abandoned during key selection");
            return SubmitOutcome::Superseded;
        }

        let outcome = self
            .generator
            .generate(params, self.progress_reporter(token))
            .await;

        match outcome {
            Ok(result) => self.settle_success(token, result),
            Err(err) => self.settle_failure(token, err).await,
        }
    }

    /// Run key selection first when no key is held or the last one was rejected.
    async fn ensure_credential(&self, token: u64) -> Result<(), ApiError> {
        let Some(credentials) = &self.credentials else {
            return Ok(());
        };
        let required = self.shared.state.lock().snapshot.reauthorization_required;
        if !required && credentials.has_credential() {
            return Ok(());
        }
        let started = self.shared.with_current(token, |state| {
            state.snapshot.progress_message = Some(AWAITING_KEY_PROGRESS.to_string());
            state.selecting_credential = true;
        });
        if started.is_none() {
            return Ok(());
        }
        let guard = SelectionGuard::adopt(&self.shared);
        let selected = credentials.select_credential().await;
        guard.finish(selected.is_ok());
        selected
    }

    fn progress_reporter(&self, token: u64) -> ProgressReporter {
        let shared = self.shared.clone();
        ProgressReporter::new(move |message| {
            let applied = shared.with_current(token, |state| {
                state.snapshot.progress_message = Some(message.to_string());
            });
            if applied.is_none() {
                debug!(token, "Dropped progress for settled request");
            }
        })
    }

    fn settle_success(&self, token: u64, result: GenerationResult) -> SubmitOutcome {
        let video_ref = result.video_ref.clone();
        let applied = self.shared.with_current(token, |state| {
            let snap = &mut state.snapshot;
            snap.phase = LifecyclePhase::Success;
            snap.result = Some(result);
            snap.progress_message = None;
        });
        match applied {
            Some(()) => {
                info!(token, video = %video_ref, "Generation succeeded");
                SubmitOutcome::Succeeded
            }
            None => {
                warn!(token, "Discarding stale generation result");
                SubmitOutcome::Superseded
            }
        }
    }

    async fn settle_failure(&self, token: u64, err: ApiError) -> SubmitOutcome {
        let record = classify(&err.to_string());
        let kind = record.kind;
        let reauthorize = kind.requires_reauthorization() && self.credentials.is_some();
        let applied = self.shared.with_current(token, |state| {
            state.selecting_credential |= reauthorize;
            let snap = &mut state.snapshot;
            snap.phase = LifecyclePhase::Error;
            snap.error = Some(record);
            snap.progress_message = None;
            if reauthorize {
                snap.reauthorization_required = true;
            }
        });
        if applied.is_none() {
            warn!(token, error = %err, "Discarding stale generation failure");
            return SubmitOutcome::Superseded;
        }
        warn!(token, kind = ?kind, error = %err, "Generation failed");

        if let (true, Some(credentials)) = (reauthorize, &self.credentials) {
            let guard = SelectionGuard::adopt(&self.shared);
            credentials.invalidate();
            let selected = credentials.select_credential().await;
            if let Err(e) = &selected {
                warn!(error = %e, "Re-authorization did not complete");
            }
            guard.finish(selected.is_ok());
        }
        SubmitOutcome::Failed(kind)
    }

    /// Run the credential selection flow on demand. Refused while a generation or
    /// another selection is in progress.
    pub async fn reauthorize(&self) -> Result<(), ApiError> {
        let Some(credentials) = &self.credentials else {
            return Ok(());
        };
        let guard = {
            let mut state = self.shared.state.lock();
            if state.selecting_credential || state.snapshot.phase == LifecyclePhase::Loading {
                return Err(ApiError::InvalidTransition(
                    "key selection is already in progress".to_string(),
                ));
            }
            state.selecting_credential = true;
            SelectionGuard::adopt(&self.shared)
        };
        let selected = credentials.select_credential().await;
        guard.finish(selected.is_ok());
        selected
    }

    /// Start over: drop result, error, parameters and seed.
    pub fn reset_to_idle(&self) {
        let mut state = self.shared.state.lock();
        state.request_token += 1;
        let reauthorization_required = state.snapshot.reauthorization_required;
        state.snapshot = LifecycleSnapshot {
            reauthorization_required,
            ..LifecycleSnapshot::default()
        };
        self.shared.publish(&state);
        info!(token = state.request_token, "Lifecycle reset to idle");
    }

    /// Reopen the form pre-filled with the last submission, or reset if there was none.
    pub fn prepare_retry_from_error(&self) {
        let mut state = self.shared.state.lock();
        let Some(last) = state.snapshot.last_parameters.clone() else {
            drop(state);
            self.reset_to_idle();
            return;
        };
        state.request_token += 1;
        let snap = &mut state.snapshot;
        snap.phase = LifecyclePhase::Idle;
        snap.error = None;
        snap.result = None;
        snap.progress_message = None;
        snap.pending_seed = Some(last);
        self.shared.publish(&state);
        debug!(token = state.request_token, "Form seeded from last submission");
    }

    /// Dismiss an error, keeping the last submission as the form seed.
    pub fn acknowledge_error(&self) -> bool {
        if self.phase() != LifecyclePhase::Error {
            return false;
        }
        self.prepare_retry_from_error();
        true
    }

    /// Seed an extension of the last successful video.
    pub fn prepare_extend(&self) -> Result<Arc<GenerationParameters>, ApiError> {
        let mut state = self.shared.state.lock();
        let (last, result) = match (
            &state.snapshot.last_parameters,
            &state.snapshot.result,
        ) {
            (Some(last), Some(result)) => (last.clone(), result.clone()),
            _ => {
                return Err(ApiError::InvalidTransition(
                    "extend needs a completed generation".to_string(),
                ))
            }
        };

        let file_name = format!("last_video.{}", video_extension(&result.mime_type));
        let input_video = match self
            .encoder
            .encode_bytes(&file_name, &result.mime_type, &result.media)
        {
            Ok(video) => video,
            Err(e) => {
                let err = ApiError::from(e);
                let snap = &mut state.snapshot;
                snap.phase = LifecyclePhase::Error;
                snap.error = Some(classify(&err.to_string()));
                snap.progress_message = None;
                self.shared.publish(&state);
                warn!(error = %err, "Could not package last video for extension");
                return Err(err);
            }
        };

        let seed = Arc::new(GenerationParameters {
            prompt: String::new(),
            model: last.model,
            aspect_ratio: last.aspect_ratio,
            resolution: Resolution::P720,
            mode: GenerationMode::ExtendVideo,
            quality: VideoQuality::Medium,
            input_video: Some(input_video),
            input_video_ref: Some(result.video_ref.clone()),
            ..GenerationParameters::default()
        });

        state.request_token += 1;
        let snap = &mut state.snapshot;
        snap.phase = LifecyclePhase::Idle;
        snap.error = None;
        snap.result = None;
        snap.progress_message = None;
        snap.pending_seed = Some(seed.clone());
        self.shared.publish(&state);
        info!(video = %result.video_ref, "Extension seeded from last video");
        Ok(seed)
    }

    /// Hand the pending seed to the form exactly once.
    pub fn take_pending_seed(&self) -> Option<Arc<GenerationParameters>> {
        let mut state = self.shared.state.lock();
        let seed = state.snapshot.pending_seed.take();
        if seed.is_some() {
            self.shared.publish(&state);
        }
        seed
    }
}

fn video_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => "mp4",
    }
}
