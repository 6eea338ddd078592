//! CLI parse: clap types for vidgen. No behavior; definitions only.

use crate::params::{
    AspectRatio, EncodingProfile, GenerationMode, OverlayPosition, VeoModel, VideoQuality,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// vidgen - generate videos from prompts, frames and reference images
#[derive(Parser)]
#[command(name = "vidgen")]
#[command(about = "Generate, retry and extend videos with a Veo-style provider")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config/ is read from here)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a video, optionally extending it afterwards
    Generate {
        #[command(flatten)]
        selections: SelectionArgs,
        /// Where to write the video (default: vidgen-<timestamp>.mp4)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Extend the result with this prompt; repeat to chain extensions
        #[arg(long = "extend", value_name = "PROMPT")]
        extend_prompts: Vec<String>,
        /// Retry this many times when generation fails
        #[arg(long, default_value = "0")]
        retries: u32,
        /// Ask for the API key on the terminal instead of reading the environment
        #[arg(long)]
        prompt_for_key: bool,
    },
    /// Show the parameters that would be submitted, without calling the provider
    Check {
        #[command(flatten)]
        selections: SelectionArgs,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

/// Form selections, mirrored as flags.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Generation mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
    /// Text prompt
    #[arg(long, short)]
    pub prompt: Option<String>,
    /// Model variant
    #[arg(long, value_enum)]
    pub model: Option<ModelArg>,
    /// Aspect ratio
    #[arg(long, value_enum)]
    pub aspect_ratio: Option<AspectArg>,
    /// Quality tier (high gives 1080p where the mode allows it)
    #[arg(long, value_enum)]
    pub quality: Option<QualityArg>,
    /// Start frame image (frames mode)
    #[arg(long)]
    pub start_frame: Option<PathBuf>,
    /// End frame image (frames mode)
    #[arg(long)]
    pub end_frame: Option<PathBuf>,
    /// Loop back to the start frame (frames mode, no end frame)
    #[arg(long = "loop")]
    pub looping: bool,
    /// Reference image (references mode, up to 3)
    #[arg(long = "reference")]
    pub references: Vec<PathBuf>,
    /// Style image (references mode)
    #[arg(long)]
    pub style_image: Option<PathBuf>,
    /// Local copy of the video to extend (extend mode, preview only)
    #[arg(long)]
    pub input_video: Option<PathBuf>,
    /// Provider reference of the video to extend (extend mode)
    #[arg(long)]
    pub video_ref: Option<String>,
    /// Duration in seconds (clamped)
    #[arg(long, allow_negative_numbers = true)]
    pub duration: Option<i64>,
    /// Frame rate (clamped)
    #[arg(long, allow_negative_numbers = true)]
    pub frame_rate: Option<i64>,
    /// Encoding profile
    #[arg(long, value_enum)]
    pub encoding: Option<EncodingArg>,
    /// Background audio track
    #[arg(long)]
    pub background_audio: Option<PathBuf>,
    /// Text overlay content (enables the overlay)
    #[arg(long)]
    pub overlay_text: Option<String>,
    /// Text overlay font size (clamped)
    #[arg(long, allow_negative_numbers = true)]
    pub overlay_font_size: Option<i64>,
    /// Text overlay color
    #[arg(long)]
    pub overlay_color: Option<String>,
    /// Text overlay position
    #[arg(long, value_enum)]
    pub overlay_position: Option<PositionArg>,
}

impl SelectionArgs {
    pub fn wants_overlay(&self) -> bool {
        self.overlay_text.is_some()
            || self.overlay_font_size.is_some()
            || self.overlay_color.is_some()
            || self.overlay_position.is_some()
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Text,
    Frames,
    References,
    Extend,
}

impl From<ModeArg> for GenerationMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Text => GenerationMode::TextToVideo,
            ModeArg::Frames => GenerationMode::FramesToVideo,
            ModeArg::References => GenerationMode::ReferencesToVideo,
            ModeArg::Extend => GenerationMode::ExtendVideo,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModelArg {
    Fast,
    Standard,
}

impl From<ModelArg> for VeoModel {
    fn from(value: ModelArg) -> Self {
        match value {
            ModelArg::Fast => VeoModel::Fast,
            ModelArg::Standard => VeoModel::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AspectArg {
    Landscape,
    Portrait,
}

impl From<AspectArg> for AspectRatio {
    fn from(value: AspectArg) -> Self {
        match value {
            AspectArg::Landscape => AspectRatio::Landscape,
            AspectArg::Portrait => AspectRatio::Portrait,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum QualityArg {
    Low,
    Medium,
    High,
}

impl From<QualityArg> for VideoQuality {
    fn from(value: QualityArg) -> Self {
        match value {
            QualityArg::Low => VideoQuality::Low,
            QualityArg::Medium => VideoQuality::Medium,
            QualityArg::High => VideoQuality::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EncodingArg {
    H264,
    Hevc,
    Vp9,
}

impl From<EncodingArg> for EncodingProfile {
    fn from(value: EncodingArg) -> Self {
        match value {
            EncodingArg::H264 => EncodingProfile::H264,
            EncodingArg::Hevc => EncodingProfile::Hevc,
            EncodingArg::Vp9 => EncodingProfile::Vp9,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PositionArg {
    TopLeft,
    TopCenter,
    TopRight,
    Center,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl From<PositionArg> for OverlayPosition {
    fn from(value: PositionArg) -> Self {
        match value {
            PositionArg::TopLeft => OverlayPosition::TopLeft,
            PositionArg::TopCenter => OverlayPosition::TopCenter,
            PositionArg::TopRight => OverlayPosition::TopRight,
            PositionArg::Center => OverlayPosition::Center,
            PositionArg::BottomLeft => OverlayPosition::BottomLeft,
            PositionArg::BottomCenter => OverlayPosition::BottomCenter,
            PositionArg::BottomRight => OverlayPosition::BottomRight,
        }
    }
}
