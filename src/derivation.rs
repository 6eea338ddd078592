//! Parameter Derivation
//!
//! Turns raw form selections into the canonical, mode-consistent parameter set plus a
//! submit verdict. `derive` is pure and cheap; callers re-run it after every edit so the
//! rendered controls never drift from what would actually be submitted.
//!
//! Edits go through `SelectionEditor`, which owns the rules that depend on the previous
//! state (mode switches resetting media, overlay toggling, numeric clamping).

use crate::params::{
    resolution_for, AspectRatio, EncodingProfile, GenerationMode, GenerationParameters,
    MediaAttachment, OverlayPosition, ProviderVideoRef, TextOverlay, VeoModel, VideoQuality,
    DEFAULT_DURATION_SECS, DEFAULT_FRAME_RATE, DURATION_SECS_RANGE, FONT_SIZE_RANGE,
    FRAME_RATE_RANGE, MAX_REFERENCE_IMAGES,
};
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

/// Raw user selections, possibly inconsistent with the active mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSelections {
    pub prompt: String,
    pub model: VeoModel,
    pub aspect_ratio: AspectRatio,
    pub mode: GenerationMode,
    pub quality: VideoQuality,
    pub start_frame: Option<MediaAttachment>,
    pub end_frame: Option<MediaAttachment>,
    pub reference_images: Vec<MediaAttachment>,
    pub style_image: Option<MediaAttachment>,
    pub input_video: Option<MediaAttachment>,
    pub input_video_ref: Option<ProviderVideoRef>,
    pub is_looping: bool,
    pub duration_secs: u32,
    pub frame_rate: u32,
    pub encoding: EncodingProfile,
    pub background_audio: Option<MediaAttachment>,
    pub text_overlay: Option<TextOverlay>,
}

impl Default for RawSelections {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: VeoModel::default(),
            aspect_ratio: AspectRatio::default(),
            mode: GenerationMode::default(),
            quality: VideoQuality::default(),
            start_frame: None,
            end_frame: None,
            reference_images: Vec::new(),
            style_image: None,
            input_video: None,
            input_video_ref: None,
            is_looping: false,
            duration_secs: DEFAULT_DURATION_SECS,
            frame_rate: DEFAULT_FRAME_RATE,
            encoding: EncodingProfile::default(),
            background_audio: None,
            text_overlay: None,
        }
    }
}

impl RawSelections {
    /// Pre-populate the form from a seed (retry-from-error or extend).
    pub fn from_seed(seed: &GenerationParameters) -> Self {
        Self {
            prompt: seed.prompt.clone(),
            model: seed.model,
            aspect_ratio: seed.aspect_ratio,
            mode: seed.mode,
            quality: seed.quality,
            start_frame: seed.start_frame.clone(),
            end_frame: seed.end_frame.clone(),
            reference_images: seed.reference_images.clone(),
            style_image: seed.style_image.clone(),
            input_video: seed.input_video.clone(),
            input_video_ref: seed.input_video_ref.clone(),
            is_looping: seed.is_looping,
            duration_secs: seed.duration_secs,
            frame_rate: seed.frame_rate,
            encoding: seed.encoding,
            background_audio: seed.background_audio.clone(),
            text_overlay: seed.text_overlay.clone(),
        }
    }
}

/// Which controls the form should render as locked or unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlStates {
    pub model_locked: bool,
    pub aspect_ratio_locked: bool,
    pub quality_locked: bool,
    /// Duration, frame rate, encoding, background audio and text overlay.
    pub output_controls_disabled: bool,
    pub loop_available: bool,
}

/// Why the current selections cannot be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    MissingPrompt,
    MissingStartFrame,
    MissingReferenceImages,
    MissingReferenceImagesAndPrompt,
    MissingVideoReference,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            BlockReason::MissingPrompt => "Enter a prompt to generate a video.",
            BlockReason::MissingStartFrame => "Add a start frame to generate a video.",
            BlockReason::MissingReferenceImages => "Add at least one reference image.",
            BlockReason::MissingReferenceImagesAndPrompt => {
                "Add at least one reference image and enter a prompt."
            }
            BlockReason::MissingVideoReference => {
                "Select a previously generated video to extend; an uploaded file alone cannot be extended."
            }
        };
        f.write_str(msg)
    }
}

/// Output of a derivation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub canonical_parameters: GenerationParameters,
    pub controls: ControlStates,
    pub block_reason: Option<BlockReason>,
}

impl Derivation {
    pub fn is_submit_disabled(&self) -> bool {
        self.block_reason.is_some()
    }
}

/// Clamp a typed value into an inclusive range. Never rejects.
pub fn clamp_to(value: i64, range: &RangeInclusive<u32>) -> u32 {
    let lo = i64::from(*range.start());
    let hi = i64::from(*range.end());
    value.clamp(lo, hi) as u32
}

fn clamp_u32(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

/// Compute the canonical parameters and submit verdict for the given selections.
pub fn derive(raw: &RawSelections) -> Derivation {
    let mode = raw.mode;
    let prompt = raw.prompt.trim().to_string();
    let has_prompt = !prompt.is_empty();

    let (model, aspect_ratio) = match mode {
        GenerationMode::ReferencesToVideo => (VeoModel::Standard, AspectRatio::Landscape),
        _ => (raw.model, raw.aspect_ratio),
    };
    let quality = if mode.has_fixed_resolution() {
        VideoQuality::Medium
    } else {
        raw.quality
    };
    let resolution = resolution_for(mode, quality);

    let mut params = GenerationParameters {
        prompt,
        model,
        aspect_ratio,
        resolution,
        mode,
        quality,
        ..GenerationParameters::default()
    };

    let block_reason = match mode {
        GenerationMode::TextToVideo => (!has_prompt).then_some(BlockReason::MissingPrompt),
        GenerationMode::FramesToVideo => {
            params.start_frame = raw.start_frame.clone();
            params.end_frame = raw.end_frame.clone();
            params.is_looping = raw.is_looping && raw.end_frame.is_none();
            raw.start_frame
                .is_none()
                .then_some(BlockReason::MissingStartFrame)
        }
        GenerationMode::ReferencesToVideo => {
            params.reference_images = raw
                .reference_images
                .iter()
                .take(MAX_REFERENCE_IMAGES)
                .cloned()
                .collect();
            params.style_image = raw.style_image.clone();
            match (params.reference_images.is_empty(), has_prompt) {
                (true, false) => Some(BlockReason::MissingReferenceImagesAndPrompt),
                (true, true) => Some(BlockReason::MissingReferenceImages),
                (false, false) => Some(BlockReason::MissingPrompt),
                (false, true) => None,
            }
        }
        GenerationMode::ExtendVideo => {
            params.input_video = raw.input_video.clone();
            params.input_video_ref = raw.input_video_ref.clone();
            raw.input_video_ref
                .is_none()
                .then_some(BlockReason::MissingVideoReference)
        }
    };

    // Extend keeps the output controls at their defaults whatever the form holds.
    if mode != GenerationMode::ExtendVideo {
        params.duration_secs = clamp_u32(raw.duration_secs, &DURATION_SECS_RANGE);
        params.frame_rate = clamp_u32(raw.frame_rate, &FRAME_RATE_RANGE);
        params.encoding = raw.encoding;
        params.background_audio = raw.background_audio.clone();
        params.text_overlay = raw.text_overlay.clone().map(|mut overlay| {
            overlay.font_size = clamp_u32(overlay.font_size, &FONT_SIZE_RANGE);
            overlay
        });
    }

    let controls = ControlStates {
        model_locked: mode == GenerationMode::ReferencesToVideo,
        aspect_ratio_locked: mode == GenerationMode::ReferencesToVideo,
        quality_locked: mode.has_fixed_resolution(),
        output_controls_disabled: mode == GenerationMode::ExtendVideo,
        loop_available: mode == GenerationMode::FramesToVideo && raw.end_frame.is_none(),
    };

    Derivation {
        canonical_parameters: params,
        controls,
        block_reason,
    }
}

/// Applies edits to a `RawSelections` record.
#[derive(Debug, Clone, Default)]
pub struct SelectionEditor {
    selections: RawSelections,
    remembered_overlay: Option<TextOverlay>,
}

impl SelectionEditor {
    pub fn new(selections: RawSelections) -> Self {
        let remembered_overlay = selections.text_overlay.clone();
        Self {
            selections,
            remembered_overlay,
        }
    }

    pub fn from_seed(seed: &GenerationParameters) -> Self {
        Self::new(RawSelections::from_seed(seed))
    }

    pub fn selections(&self) -> &RawSelections {
        &self.selections
    }

    pub fn into_selections(self) -> RawSelections {
        self.selections
    }

    pub fn derive(&self) -> Derivation {
        derive(&self.selections)
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.selections.prompt = prompt.into();
    }

    pub fn set_model(&mut self, model: VeoModel) {
        self.selections.model = model;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.selections.aspect_ratio = aspect_ratio;
    }

    pub fn set_quality(&mut self, quality: VideoQuality) {
        self.selections.quality = quality;
    }

    /// Switching mode drops every mode-specific attachment and output setting.
    pub fn set_mode(&mut self, mode: GenerationMode) {
        if self.selections.mode == mode {
            return;
        }
        let s = &mut self.selections;
        s.mode = mode;
        s.start_frame = None;
        s.end_frame = None;
        s.is_looping = false;
        s.reference_images.clear();
        s.style_image = None;
        s.input_video = None;
        s.input_video_ref = None;
        s.duration_secs = DEFAULT_DURATION_SECS;
        s.frame_rate = DEFAULT_FRAME_RATE;
        s.encoding = EncodingProfile::default();
        s.background_audio = None;
        s.text_overlay = None;
        self.remembered_overlay = None;
    }

    pub fn set_start_frame(&mut self, frame: Option<MediaAttachment>) {
        self.selections.start_frame = frame;
    }

    /// An end frame and looping are mutually exclusive.
    pub fn set_end_frame(&mut self, frame: Option<MediaAttachment>) {
        if frame.is_some() {
            self.selections.is_looping = false;
        }
        self.selections.end_frame = frame;
    }

    /// Returns false when looping is unavailable because an end frame is set.
    pub fn set_looping(&mut self, looping: bool) -> bool {
        if looping && self.selections.end_frame.is_some() {
            return false;
        }
        self.selections.is_looping = looping;
        true
    }

    /// Returns false when the reference list is already full.
    pub fn add_reference_image(&mut self, image: MediaAttachment) -> bool {
        if self.selections.reference_images.len() >= MAX_REFERENCE_IMAGES {
            return false;
        }
        self.selections.reference_images.push(image);
        true
    }

    pub fn remove_reference_image(&mut self, index: usize) -> Option<MediaAttachment> {
        if index < self.selections.reference_images.len() {
            Some(self.selections.reference_images.remove(index))
        } else {
            None
        }
    }

    pub fn set_style_image(&mut self, image: Option<MediaAttachment>) {
        self.selections.style_image = image;
    }

    /// A preview file without a provider reference is kept but cannot be submitted.
    pub fn set_input_video(
        &mut self,
        video: Option<MediaAttachment>,
        video_ref: Option<ProviderVideoRef>,
    ) {
        self.selections.input_video = video;
        self.selections.input_video_ref = video_ref;
    }

    pub fn set_duration(&mut self, secs: i64) {
        self.selections.duration_secs = clamp_to(secs, &DURATION_SECS_RANGE);
    }

    pub fn set_frame_rate(&mut self, fps: i64) {
        self.selections.frame_rate = clamp_to(fps, &FRAME_RATE_RANGE);
    }

    pub fn set_encoding(&mut self, encoding: EncodingProfile) {
        self.selections.encoding = encoding;
    }

    pub fn set_background_audio(&mut self, audio: Option<MediaAttachment>) {
        self.selections.background_audio = audio;
    }

    pub fn overlay_enabled(&self) -> bool {
        self.selections.text_overlay.is_some()
    }

    /// Enabling restores the last overlay entered since the last mode switch, or defaults.
    /// Disabling removes the overlay from the selections entirely.
    pub fn set_overlay_enabled(&mut self, enabled: bool) {
        if enabled {
            if self.selections.text_overlay.is_none() {
                self.selections.text_overlay =
                    Some(self.remembered_overlay.clone().unwrap_or_default());
            }
        } else if let Some(overlay) = self.selections.text_overlay.take() {
            self.remembered_overlay = Some(overlay);
        }
    }

    pub fn set_overlay_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.edit_overlay(|overlay| overlay.text = text);
    }

    pub fn set_overlay_font_size(&mut self, size: i64) {
        let size = clamp_to(size, &FONT_SIZE_RANGE);
        self.edit_overlay(|overlay| overlay.font_size = size);
    }

    pub fn set_overlay_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        self.edit_overlay(|overlay| overlay.color = color);
    }

    pub fn set_overlay_position(&mut self, position: OverlayPosition) {
        self.edit_overlay(|overlay| overlay.position = position);
    }

    fn edit_overlay(&mut self, edit: impl FnOnce(&mut TextOverlay)) {
        if let Some(overlay) = self.selections.text_overlay.as_mut() {
            edit(overlay);
        }
    }
}
