//! CLI presentation: text and json formatters for check, generate and config.

use crate::config::StudioConfig;
use crate::derivation::{ControlStates, Derivation};
use crate::error::ApiError;
use crate::params::{GenerationParameters, GenerationResult, MediaAttachment};
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

const REDACTED: &str = "<redacted>";

/// JSON view of a derivation. Media is listed by file name, never by content.
#[derive(Serialize)]
struct CheckSummary<'a> {
    submittable: bool,
    block_reason: Option<String>,
    controls: &'a ControlStates,
    parameters: ParameterSummary<'a>,
}

#[derive(Serialize)]
struct ParameterSummary<'a> {
    mode: String,
    prompt: &'a str,
    model: &'a str,
    aspect_ratio: &'a str,
    resolution: &'a str,
    quality: String,
    duration_secs: u32,
    frame_rate: u32,
    encoding: String,
    is_looping: bool,
    start_frame: Option<&'a str>,
    end_frame: Option<&'a str>,
    reference_images: Vec<&'a str>,
    style_image: Option<&'a str>,
    input_video: Option<&'a str>,
    input_video_ref: Option<&'a str>,
    background_audio: Option<&'a str>,
    text_overlay: Option<&'a crate::params::TextOverlay>,
}

fn file_name(media: &Option<MediaAttachment>) -> Option<&str> {
    media.as_ref().map(|m| m.file_name.as_str())
}

impl<'a> ParameterSummary<'a> {
    fn new(p: &'a GenerationParameters) -> Self {
        Self {
            mode: p.mode.to_string(),
            prompt: &p.prompt,
            model: p.model.id(),
            aspect_ratio: p.aspect_ratio.as_str(),
            resolution: p.resolution.as_str(),
            quality: p.quality.to_string(),
            duration_secs: p.duration_secs,
            frame_rate: p.frame_rate,
            encoding: p.encoding.to_string(),
            is_looping: p.is_looping,
            start_frame: file_name(&p.start_frame),
            end_frame: file_name(&p.end_frame),
            reference_images: p
                .reference_images
                .iter()
                .map(|m| m.file_name.as_str())
                .collect(),
            style_image: file_name(&p.style_image),
            input_video: file_name(&p.input_video),
            input_video_ref: p.input_video_ref.as_ref().map(|r| r.as_str()),
            background_audio: file_name(&p.background_audio),
            text_overlay: p.text_overlay.as_ref(),
        }
    }
}

pub fn format_check_json(derivation: &Derivation) -> Result<String, ApiError> {
    let summary = CheckSummary {
        submittable: !derivation.is_submit_disabled(),
        block_reason: derivation.block_reason.map(|r| r.to_string()),
        controls: &derivation.controls,
        parameters: ParameterSummary::new(&derivation.canonical_parameters),
    };
    serde_json::to_string_pretty(&summary)
        .map_err(|e| ApiError::ConfigError(format!("Failed to serialize check result: {}", e)))
}

pub fn format_check_text(derivation: &Derivation) -> String {
    let p = &derivation.canonical_parameters;
    let c = &derivation.controls;

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Parameter", "Value", "Control"]);

    let locked = |flag: bool| if flag { "locked" } else { "" };
    let output_state = locked(c.output_controls_disabled);
    let none = || "-".to_string();

    let rows: Vec<(&str, String, &str)> = vec![
        ("Mode", p.mode.to_string(), ""),
        ("Prompt", p.prompt.clone(), ""),
        ("Model", p.model.to_string(), locked(c.model_locked)),
        ("Aspect ratio", p.aspect_ratio.to_string(), locked(c.aspect_ratio_locked)),
        ("Quality", p.quality.to_string(), locked(c.quality_locked)),
        ("Resolution", p.resolution.to_string(), ""),
        ("Duration", format!("{}s", p.duration_secs), output_state),
        ("Frame rate", format!("{} fps", p.frame_rate), output_state),
        ("Encoding", p.encoding.to_string(), output_state),
        (
            "Loop",
            p.is_looping.to_string(),
            if c.loop_available { "" } else { "unavailable" },
        ),
        (
            "Start frame",
            file_name(&p.start_frame).map(str::to_string).unwrap_or_else(none),
            "",
        ),
        (
            "End frame",
            file_name(&p.end_frame).map(str::to_string).unwrap_or_else(none),
            "",
        ),
        (
            "References",
            if p.reference_images.is_empty() {
                none()
            } else {
                p.reference_images
                    .iter()
                    .map(|m| m.file_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            },
            "",
        ),
        (
            "Style image",
            file_name(&p.style_image).map(str::to_string).unwrap_or_else(none),
            "",
        ),
        (
            "Video to extend",
            p.input_video_ref
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(none),
            "",
        ),
        (
            "Background audio",
            file_name(&p.background_audio)
                .map(str::to_string)
                .unwrap_or_else(none),
            output_state,
        ),
        (
            "Text overlay",
            p.text_overlay
                .as_ref()
                .map(|o| format!("\"{}\" {}px {}", o.text, o.font_size, o.color))
                .unwrap_or_else(none),
            output_state,
        ),
    ];
    for (name, value, state) in rows {
        table.add_row(vec![name.to_string(), value, state.to_string()]);
    }

    let verdict = match derivation.block_reason {
        None => format!("{}", "Ready to generate".green()),
        Some(reason) => format!("{} {}", "Blocked:".red(), reason),
    };
    format!("{}\n{}", table, verdict)
}

/// One line per written video.
pub fn format_outcome_line(path: &Path, result: &GenerationResult) -> String {
    format!(
        "{} {} ({} bytes, {}) ref={}",
        "Saved".green(),
        path.display(),
        result.media.len(),
        result.mime_type,
        result.video_ref
    )
}

/// Effective configuration as TOML, with any inline API key hidden.
pub fn format_config_toml(config: &StudioConfig) -> Result<String, ApiError> {
    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some(REDACTED.to_string());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| ApiError::ConfigError(format!("Failed to render configuration: {}", e)))
}
