//! CLI route: run context and command dispatch. Builds selections through the editor,
//! drives the lifecycle controller, and hands results to presentation.

use crate::cli::parse::{Commands, SelectionArgs};
use crate::cli::presentation::{
    format_check_json, format_check_text, format_config_toml, format_outcome_line,
};
use crate::config::{ConfigLoader, StudioConfig};
use crate::derivation::{Derivation, SelectionEditor};
use crate::error::ApiError;
use crate::lifecycle::{LifecycleController, LifecyclePhase, SubmitOutcome};
use crate::media::{Base64MediaEncoder, MediaEncoder, MediaKind};
use crate::params::{GenerationParameters, GenerationResult, ProviderVideoRef};
use crate::provider::{
    ApiKeyStore, CredentialProvider, EnvCredentialProvider, PromptCredentialProvider, VeoClient,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Runtime context for CLI execution: workspace and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: StudioConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Generate {
                selections,
                output,
                extend_prompts,
                retries,
                prompt_for_key,
            } => {
                self.handle_generate(
                    selections,
                    output.as_deref(),
                    extend_prompts,
                    *retries,
                    *prompt_for_key,
                )
                .await
            }
            Commands::Check { selections, format } => {
                let editor = build_editor(selections, &self.config, &Base64MediaEncoder).await?;
                let derivation = editor.derive();
                match format.as_str() {
                    "json" => format_check_json(&derivation),
                    "text" => Ok(format_check_text(&derivation)),
                    other => Err(ApiError::ConfigError(format!(
                        "Invalid format: {} (must be 'text' or 'json')",
                        other
                    ))),
                }
            }
            Commands::Config => format_config_toml(&self.config),
        }
    }

    async fn handle_generate(
        &self,
        selections: &SelectionArgs,
        output: Option<&Path>,
        extend_prompts: &[String],
        retries: u32,
        prompt_for_key: bool,
    ) -> Result<String, ApiError> {
        let encoder = Arc::new(Base64MediaEncoder);
        let editor = build_editor(selections, &self.config, encoder.as_ref()).await?;
        let params = submittable(editor.derive())?;

        let settings = &self.config.provider;
        let keys = ApiKeyStore::new(settings.resolve_api_key());
        let credentials: Arc<dyn CredentialProvider> = if prompt_for_key {
            Arc::new(PromptCredentialProvider::new(keys.clone()))
        } else {
            Arc::new(EnvCredentialProvider::new(
                keys.clone(),
                settings.api_key_env.clone(),
            ))
        };
        let client = VeoClient::new(settings, keys)?;
        let controller =
            LifecycleController::new(Arc::new(client), encoder).with_credentials(credentials);
        let progress_task = spawn_progress_printer(&controller);

        let base_output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_output_path());
        let mut lines = Vec::new();

        let outcome = submit_with_retries(&controller, params, retries).await;
        let result = finish(&controller, outcome, &progress_task)?;
        write_video(&base_output, &result).await?;
        lines.push(format_outcome_line(&base_output, &result));

        for (index, prompt) in extend_prompts.iter().enumerate() {
            let seed = controller.prepare_extend().inspect_err(|_| progress_task.abort())?;
            controller.take_pending_seed();
            let mut editor = SelectionEditor::from_seed(&seed);
            editor.set_prompt(prompt.clone());
            let params = submittable(editor.derive()).inspect_err(|_| progress_task.abort())?;

            let outcome = submit_with_retries(&controller, params, retries).await;
            let result = finish(&controller, outcome, &progress_task)?;
            let path = extension_output_path(&base_output, index + 1);
            write_video(&path, &result).await?;
            lines.push(format_outcome_line(&path, &result));
        }

        progress_task.abort();
        Ok(lines.join("\n"))
    }

    fn default_output_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        self.workspace_root.join(format!("vidgen-{}.mp4", stamp))
    }
}

/// Apply flags to a fresh form, in the same order a user would fill it in.
pub async fn build_editor(
    args: &SelectionArgs,
    config: &StudioConfig,
    encoder: &dyn MediaEncoder,
) -> Result<SelectionEditor, ApiError> {
    let mut editor = SelectionEditor::new(config.defaults.raw_selections());

    // Mode first: switching resets everything mode-specific.
    if let Some(mode) = args.mode {
        editor.set_mode(mode.into());
    }
    if let Some(prompt) = &args.prompt {
        editor.set_prompt(prompt.clone());
    }
    if let Some(model) = args.model {
        editor.set_model(model.into());
    }
    if let Some(aspect) = args.aspect_ratio {
        editor.set_aspect_ratio(aspect.into());
    }
    if let Some(quality) = args.quality {
        editor.set_quality(quality.into());
    }

    if let Some(path) = &args.start_frame {
        editor.set_start_frame(Some(encoder.encode_file(path, MediaKind::Image).await?));
    }
    if let Some(path) = &args.end_frame {
        editor.set_end_frame(Some(encoder.encode_file(path, MediaKind::Image).await?));
    }
    if args.looping && !editor.set_looping(true) {
        warn!("--loop ignored: an end frame is set");
    }
    for path in &args.references {
        let image = encoder.encode_file(path, MediaKind::Image).await?;
        if !editor.add_reference_image(image) {
            warn!(path = %path.display(), "Reference image ignored: limit reached");
        }
    }
    if let Some(path) = &args.style_image {
        editor.set_style_image(Some(encoder.encode_file(path, MediaKind::Image).await?));
    }
    if args.input_video.is_some() || args.video_ref.is_some() {
        let video = match &args.input_video {
            Some(path) => Some(encoder.encode_file(path, MediaKind::Video).await?),
            None => None,
        };
        editor.set_input_video(video, args.video_ref.clone().map(ProviderVideoRef));
    }

    if let Some(secs) = args.duration {
        editor.set_duration(secs);
    }
    if let Some(fps) = args.frame_rate {
        editor.set_frame_rate(fps);
    }
    if let Some(encoding) = args.encoding {
        editor.set_encoding(encoding.into());
    }
    if let Some(path) = &args.background_audio {
        editor.set_background_audio(Some(encoder.encode_file(path, MediaKind::Audio).await?));
    }

    if args.wants_overlay() {
        editor.set_overlay_enabled(true);
        if let Some(text) = &args.overlay_text {
            editor.set_overlay_text(text.clone());
        }
        if let Some(size) = args.overlay_font_size {
            editor.set_overlay_font_size(size);
        }
        if let Some(color) = &args.overlay_color {
            editor.set_overlay_color(color.clone());
        }
        if let Some(position) = args.overlay_position {
            editor.set_overlay_position(position.into());
        }
    }

    Ok(editor)
}

fn submittable(derivation: Derivation) -> Result<GenerationParameters, ApiError> {
    match derivation.block_reason {
        Some(reason) => Err(ApiError::SubmissionBlocked(reason.to_string())),
        None => Ok(derivation.canonical_parameters),
    }
}

async fn submit_with_retries(
    controller: &LifecycleController,
    params: GenerationParameters,
    retries: u32,
) -> SubmitOutcome {
    let mut outcome = controller.submit(params).await;
    let mut attempt = 0;
    while matches!(outcome, SubmitOutcome::Failed(_)) && attempt < retries {
        attempt += 1;
        info!(attempt, "Retrying generation");
        outcome = controller.retry().await;
    }
    outcome
}

fn finish(
    controller: &LifecycleController,
    outcome: SubmitOutcome,
    progress_task: &JoinHandle<()>,
) -> Result<GenerationResult, ApiError> {
    let snapshot = controller.snapshot();
    match (outcome, snapshot.result) {
        (SubmitOutcome::Succeeded, Some(result)) => Ok(result),
        _ => {
            progress_task.abort();
            let message = snapshot
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| format!("generation ended in {:?}", outcome));
            Err(ApiError::GenerationFailed(message))
        }
    }
}

fn spawn_progress_printer(controller: &LifecycleController) -> JoinHandle<()> {
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        let mut last: Option<String> = None;
        while events.changed().await.is_ok() {
            let snapshot = events.borrow_and_update().clone();
            if snapshot.phase != LifecyclePhase::Loading {
                continue;
            }
            if snapshot.progress_message != last {
                if let Some(message) = &snapshot.progress_message {
                    eprintln!("  {}", message);
                }
                last = snapshot.progress_message;
            }
        }
    })
}

fn extension_output_path(base: &Path, index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vidgen".to_string());
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    base.with_file_name(format!("{}-ext{}.{}", stem, index, ext))
}

async fn write_video(path: &Path, result: &GenerationResult) -> Result<(), ApiError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &result.media[..]).await?;
    info!(path = %path.display(), bytes = result.media.len(), "Video written");
    Ok(())
}
