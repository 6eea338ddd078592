//! Integration tests for form editing and parameter derivation

use vidgen::derivation::{BlockReason, RawSelections, SelectionEditor};
use vidgen::params::{
    AspectRatio, EncodingProfile, GenerationMode, MediaAttachment, OverlayPosition,
    ProviderVideoRef, Resolution, VeoModel, VideoQuality, DEFAULT_DURATION_SECS,
    DEFAULT_FRAME_RATE,
};

fn image(name: &str) -> MediaAttachment {
    MediaAttachment {
        file_name: name.to_string(),
        mime_type: "image/png".to_string(),
        base64: "iVBORw0KGgo=".to_string(),
    }
}

#[test]
fn test_text_mode_high_quality_is_1080p() {
    let mut editor = SelectionEditor::new(RawSelections::default());
    editor.set_prompt("  a neon city at night  ");
    editor.set_quality(VideoQuality::High);

    let derivation = editor.derive();

    assert!(!derivation.is_submit_disabled());
    let params = derivation.canonical_parameters;
    assert_eq!(params.prompt, "a neon city at night");
    assert_eq!(params.resolution, Resolution::P1080);
    assert_eq!(params.quality, VideoQuality::High);
}

#[test]
fn test_references_mode_pins_model_aspect_and_resolution() {
    let mut editor = SelectionEditor::new(RawSelections::default());
    editor.set_model(VeoModel::Fast);
    editor.set_aspect_ratio(AspectRatio::Portrait);
    editor.set_quality(VideoQuality::High);
    editor.set_mode(GenerationMode::ReferencesToVideo);

    assert_eq!(
        editor.derive().block_reason,
        Some(BlockReason::MissingReferenceImagesAndPrompt)
    );

    editor.set_prompt("the character walks through a market");
    assert_eq!(
        editor.derive().block_reason,
        Some(BlockReason::MissingReferenceImages)
    );

    assert!(editor.add_reference_image(image("hero.png")));
    let derivation = editor.derive();
    assert!(derivation.block_reason.is_none());
    assert!(derivation.controls.model_locked);
    assert!(derivation.controls.aspect_ratio_locked);
    assert!(derivation.controls.quality_locked);

    let params = derivation.canonical_parameters;
    assert_eq!(params.model, VeoModel::Standard);
    assert_eq!(params.aspect_ratio, AspectRatio::Landscape);
    assert_eq!(params.resolution, Resolution::P720);
    assert_eq!(params.quality, VideoQuality::Medium);

    // Raw selections keep what the user picked.
    assert_eq!(editor.selections().model, VeoModel::Fast);
    assert_eq!(editor.selections().aspect_ratio, AspectRatio::Portrait);
}

#[test]
fn test_reference_list_is_capped() {
    let mut editor = SelectionEditor::new(RawSelections::default());
    editor.set_mode(GenerationMode::ReferencesToVideo);
    assert!(editor.add_reference_image(image("a.png")));
    assert!(editor.add_reference_image(image("b.png")));
    assert!(editor.add_reference_image(image("c.png")));
    assert!(!editor.add_reference_image(image("d.png")));

    let removed = editor.remove_reference_image(1).unwrap();
    assert_eq!(removed.file_name, "b.png");
    assert!(editor.add_reference_image(image("d.png")));
    let names: Vec<_> = editor
        .selections()
        .reference_images
        .iter()
        .map(|m| m.file_name.clone())
        .collect();
    assert_eq!(names, vec!["a.png", "c.png", "d.png"]);
}

#[test]
fn test_frames_mode_loop_and_end_frame_exclusive() {
    let mut editor = SelectionEditor::new(RawSelections::default());
    editor.set_mode(GenerationMode::FramesToVideo);
    assert_eq!(
        editor.derive().block_reason,
        Some(BlockReason::MissingStartFrame)
    );

    editor.set_start_frame(Some(image("start.png")));
    assert!(editor.set_looping(true));
    let derivation = editor.derive();
    assert!(derivation.block_reason.is_none());
    assert!(derivation.canonical_parameters.is_looping);
    assert!(derivation.controls.loop_available);

    editor.set_end_frame(Some(image("end.png")));
    let derivation = editor.derive();
    assert!(!derivation.canonical_parameters.is_looping);
    assert!(!derivation.controls.loop_available);
    assert!(!editor.set_looping(true));
}

#[test]
fn test_mode_switch_drops_mode_specific_state() {
    let mut editor = SelectionEditor::new(RawSelections::default());
    editor.set_mode(GenerationMode::FramesToVideo);
    editor.set_prompt("keep me");
    editor.set_start_frame(Some(image("start.png")));
    editor.set_duration(5);
    editor.set_frame_rate(30);
    editor.set_encoding(EncodingProfile::Vp9);
    editor.set_overlay_enabled(true);
    editor.set_overlay_text("Title");

    editor.set_mode(GenerationMode::TextToVideo);
    editor.set_mode(GenerationMode::FramesToVideo);

    let raw = editor.selections();
    assert_eq!(raw.prompt, "keep me");
    assert!(raw.start_frame.is_none());
    assert_eq!(raw.duration_secs, DEFAULT_DURATION_SECS);
    assert_eq!(raw.frame_rate, DEFAULT_FRAME_RATE);
    assert_eq!(raw.encoding, EncodingProfile::H264);
    assert!(raw.text_overlay.is_none());

    // The overlay from before the switch is not restored.
    editor.set_overlay_enabled(true);
    assert!(editor.selections().text_overlay.as_ref().unwrap().text.is_empty());
}

#[test]
fn test_overlay_toggle_restores_last_entry() {
    let mut editor = SelectionEditor::new(RawSelections::default());
    editor.set_prompt("sunrise");
    editor.set_overlay_enabled(true);
    editor.set_overlay_text("Day one");
    editor.set_overlay_font_size(500);
    editor.set_overlay_position(OverlayPosition::TopLeft);

    editor.set_overlay_enabled(false);
    assert!(editor.derive().canonical_parameters.text_overlay.is_none());

    editor.set_overlay_enabled(true);
    let overlay = editor.derive().canonical_parameters.text_overlay.unwrap();
    assert_eq!(overlay.text, "Day one");
    assert_eq!(overlay.font_size, 96);
    assert_eq!(overlay.position, OverlayPosition::TopLeft);
}

#[test]
fn test_extend_requires_provider_reference() {
    let mut editor = SelectionEditor::new(RawSelections::default());
    editor.set_mode(GenerationMode::ExtendVideo);
    editor.set_input_video(
        Some(MediaAttachment {
            file_name: "clip.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
            base64: "AAAA".to_string(),
        }),
        None,
    );
    assert_eq!(
        editor.derive().block_reason,
        Some(BlockReason::MissingVideoReference)
    );

    editor.set_input_video(None, Some(ProviderVideoRef("files/xyz".to_string())));
    let derivation = editor.derive();
    assert!(derivation.block_reason.is_none());
    assert!(derivation.controls.output_controls_disabled);
}

#[test]
fn test_out_of_range_numbers_are_clamped() {
    let mut editor = SelectionEditor::new(RawSelections::default());
    editor.set_prompt("time lapse");
    editor.set_duration(-10);
    editor.set_frame_rate(1_000);

    let params = editor.derive().canonical_parameters;
    assert_eq!(params.duration_secs, 4);
    assert_eq!(params.frame_rate, 60);
}
