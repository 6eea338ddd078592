//! Integration tests for extending a previously generated video

use crate::integration::test_utils::{
    controller_for, portrait_text_params, text_params, video_result, FakeGenerator,
};
use base64::Engine as _;
use std::sync::Arc;
use vidgen::classifier::ErrorKind;
use vidgen::derivation::SelectionEditor;
use vidgen::error::ApiError;
use vidgen::lifecycle::{LifecyclePhase, SubmitOutcome};
use vidgen::params::{
    AspectRatio, GenerationMode, Resolution, VeoModel, VideoQuality, DEFAULT_DURATION_SECS,
};

#[tokio::test]
async fn test_extend_seed_carries_model_and_aspect_ratio() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_success(video_result(b"portrait-video", "files/p1"));
    let controller = controller_for(&generator);

    controller.submit(portrait_text_params("a tall waterfall")).await;
    let seed = controller.prepare_extend().unwrap();

    assert_eq!(seed.mode, GenerationMode::ExtendVideo);
    assert_eq!(seed.model, VeoModel::Standard);
    assert_eq!(seed.aspect_ratio, AspectRatio::Portrait);
    assert_eq!(seed.resolution, Resolution::P720);
    assert_eq!(seed.quality, VideoQuality::Medium);
    assert!(seed.prompt.is_empty());
    assert_eq!(seed.input_video_ref.as_ref().unwrap().as_str(), "files/p1");

    let video = seed.input_video.as_ref().unwrap();
    assert_eq!(video.file_name, "last_video.mp4");
    assert_eq!(video.mime_type, "video/mp4");
    assert_eq!(
        video.base64,
        base64::engine::general_purpose::STANDARD.encode(b"portrait-video")
    );

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Idle);
    assert!(snapshot.result.is_none());
    assert!(Arc::ptr_eq(snapshot.pending_seed.as_ref().unwrap(), &seed));
}

#[tokio::test]
async fn test_extension_submits_from_seeded_form() {
    let generator = Arc::new(FakeGenerator::new());
    generator
        .push_success(video_result(b"base", "files/base"))
        .push_success(video_result(b"extended", "files/extended"));
    let controller = controller_for(&generator);

    controller.submit(text_params("a paper boat")).await;
    controller.prepare_extend().unwrap();
    let seed = controller.take_pending_seed().unwrap();

    let mut editor = SelectionEditor::from_seed(&seed);
    let derivation = editor.derive();
    assert!(!derivation.is_submit_disabled());
    assert!(derivation.controls.output_controls_disabled);

    editor.set_prompt("the boat drifts out to sea");
    editor.set_duration(4);
    let params = editor.derive().canonical_parameters;
    assert_eq!(params.duration_secs, DEFAULT_DURATION_SECS);

    assert_eq!(controller.submit(params).await, SubmitOutcome::Succeeded);
    let calls = generator.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].mode, GenerationMode::ExtendVideo);
    assert_eq!(calls[1].prompt, "the boat drifts out to sea");
    assert_eq!(
        calls[1].input_video_ref.as_ref().unwrap().as_str(),
        "files/base"
    );

    // Chained: the extension itself can be extended.
    let next = controller.prepare_extend().unwrap();
    assert_eq!(next.input_video_ref.as_ref().unwrap().as_str(), "files/extended");
}

#[tokio::test]
async fn test_extend_without_result_is_refused() {
    let generator = Arc::new(FakeGenerator::new());
    let controller = controller_for(&generator);

    let err = controller.prepare_extend().unwrap_err();

    assert!(matches!(err, ApiError::InvalidTransition(_)));
    assert_eq!(controller.phase(), LifecyclePhase::Idle);
}

#[tokio::test]
async fn test_unpackageable_video_moves_to_error() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_success(video_result(b"", "files/empty"));
    let controller = controller_for(&generator);

    controller.submit(text_params("nothing much")).await;
    let err = controller.prepare_extend().unwrap_err();

    assert!(matches!(err, ApiError::Media(_)));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Error);
    let error = snapshot.error.unwrap();
    assert_eq!(error.kind, ErrorKind::Generic);
    assert!(error.message.starts_with("Video generation failed:"));
    assert!(snapshot.pending_seed.is_none());

    // The original request can still be retried from the error.
    controller.prepare_retry_from_error();
    assert_eq!(
        controller.take_pending_seed().unwrap().prompt,
        "nothing much"
    );
}
