//! Generation parameters
//!
//! Value types submitted to the generation service. A `GenerationParameters` is built
//! fresh for every submission and is never mutated afterwards; the controller shares it
//! behind an `Arc` so retries replay the exact same object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Inclusive bounds for clip duration in seconds.
pub const DURATION_SECS_RANGE: RangeInclusive<u32> = 4..=8;
pub const DEFAULT_DURATION_SECS: u32 = 8;

/// Inclusive bounds for output frame rate.
pub const FRAME_RATE_RANGE: RangeInclusive<u32> = 12..=60;
pub const DEFAULT_FRAME_RATE: u32 = 24;

/// Inclusive bounds for text overlay font size (px).
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 12..=96;
pub const DEFAULT_FONT_SIZE: u32 = 48;
pub const DEFAULT_OVERLAY_COLOR: &str = "#FFFFFF";

/// Maximum number of reference images accepted in `ReferencesToVideo`.
pub const MAX_REFERENCE_IMAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    TextToVideo,
    FramesToVideo,
    ReferencesToVideo,
    ExtendVideo,
}

impl GenerationMode {
    pub const ALL: [GenerationMode; 4] = [
        GenerationMode::TextToVideo,
        GenerationMode::FramesToVideo,
        GenerationMode::ReferencesToVideo,
        GenerationMode::ExtendVideo,
    ];

    /// Modes whose resolution does not follow the quality tier.
    pub fn has_fixed_resolution(self) -> bool {
        matches!(
            self,
            GenerationMode::ReferencesToVideo | GenerationMode::ExtendVideo
        )
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationMode::TextToVideo => "text-to-video",
            GenerationMode::FramesToVideo => "frames-to-video",
            GenerationMode::ReferencesToVideo => "references-to-video",
            GenerationMode::ExtendVideo => "extend-video",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VeoModel {
    #[default]
    #[serde(rename = "veo-3.1-fast-generate-preview")]
    Fast,
    #[serde(rename = "veo-3.1-generate-preview")]
    Standard,
}

impl VeoModel {
    pub fn id(self) -> &'static str {
        match self {
            VeoModel::Fast => "veo-3.1-fast-generate-preview",
            VeoModel::Standard => "veo-3.1-generate-preview",
        }
    }
}

impl fmt::Display for VeoModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VideoQuality::Low => "low",
            VideoQuality::Medium => "medium",
            VideoQuality::High => "high",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingProfile {
    #[default]
    H264,
    Hevc,
    Vp9,
}

impl fmt::Display for EncodingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncodingProfile::H264 => "h264",
            EncodingProfile::Hevc => "hevc",
            EncodingProfile::Vp9 => "vp9",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    TopLeft,
    TopCenter,
    TopRight,
    Center,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,
    pub font_size: u32,
    pub color: String,
    pub position: OverlayPosition,
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_OVERLAY_COLOR.to_string(),
            position: OverlayPosition::default(),
        }
    }
}

/// An uploaded or re-packaged media file, already encoded for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub base64: String,
}

impl MediaAttachment {
    /// `data:` URL suitable for previewing the attachment.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Provider-side reference to a generated video; required to extend it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderVideoRef(pub String);

impl ProviderVideoRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderVideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical parameter set handed to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub prompt: String,
    pub model: VeoModel,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub mode: GenerationMode,
    pub start_frame: Option<MediaAttachment>,
    pub end_frame: Option<MediaAttachment>,
    pub reference_images: Vec<MediaAttachment>,
    pub style_image: Option<MediaAttachment>,
    pub input_video: Option<MediaAttachment>,
    pub input_video_ref: Option<ProviderVideoRef>,
    pub is_looping: bool,
    pub quality: VideoQuality,
    pub duration_secs: u32,
    pub frame_rate: u32,
    pub encoding: EncodingProfile,
    pub background_audio: Option<MediaAttachment>,
    pub text_overlay: Option<TextOverlay>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: VeoModel::default(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            mode: GenerationMode::default(),
            start_frame: None,
            end_frame: None,
            reference_images: Vec::new(),
            style_image: None,
            input_video: None,
            input_video_ref: None,
            is_looping: false,
            quality: VideoQuality::default(),
            duration_secs: DEFAULT_DURATION_SECS,
            frame_rate: DEFAULT_FRAME_RATE,
            encoding: EncodingProfile::default(),
            background_audio: None,
            text_overlay: None,
        }
    }
}

/// Playable output of a successful generation.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub media: Arc<[u8]>,
    pub mime_type: String,
    pub video_ref: ProviderVideoRef,
}

/// Resolution is a pure function of mode and quality tier.
pub fn resolution_for(mode: GenerationMode, quality: VideoQuality) -> Resolution {
    if mode.has_fixed_resolution() {
        return Resolution::P720;
    }
    match quality {
        VideoQuality::Low | VideoQuality::Medium => Resolution::P720,
        VideoQuality::High => Resolution::P1080,
    }
}
