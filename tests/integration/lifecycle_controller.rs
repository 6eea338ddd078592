//! Integration tests for the generation lifecycle controller

use crate::integration::test_utils::{
    controller_for, controller_with_credentials, text_params, video_result, wait_until,
    FakeCredentials, FakeGenerator, GENERATING,
};
use std::sync::Arc;
use vidgen::classifier::ErrorKind;
use vidgen::lifecycle::{LifecyclePhase, SubmitOutcome};

#[tokio::test]
async fn test_successful_submission_settles_in_success() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_success(video_result(b"mp4-bytes", "files/abc"));
    let controller = controller_for(&generator);

    let outcome = controller.submit(text_params("a cat surfing")).await;

    assert_eq!(outcome, SubmitOutcome::Succeeded);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Success);
    assert!(snapshot.error.is_none());
    assert!(snapshot.progress_message.is_none());
    let result = snapshot.result.unwrap();
    assert_eq!(&result.media[..], b"mp4-bytes");
    assert_eq!(result.video_ref.as_str(), "files/abc");
    assert_eq!(snapshot.last_parameters.unwrap().prompt, "a cat surfing");
}

#[tokio::test]
async fn test_second_submission_while_loading_is_rejected() {
    let generator = Arc::new(FakeGenerator::gated());
    generator.push_success(video_result(b"first", "files/first"));
    let controller = Arc::new(controller_for(&generator));

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit(text_params("a fox")).await }
    });
    wait_until(&controller, |s| {
        s.progress_message.as_deref() == Some(GENERATING)
    })
    .await;
    assert_eq!(controller.phase(), LifecyclePhase::Loading);

    let second = controller.submit(text_params("another fox")).await;
    assert_eq!(second, SubmitOutcome::Rejected);
    assert_eq!(generator.calls().len(), 1);
    assert_eq!(
        controller.snapshot().last_parameters.unwrap().prompt,
        "a fox"
    );

    generator.release();
    assert_eq!(first.await.unwrap(), SubmitOutcome::Succeeded);
    assert_eq!(controller.phase(), LifecyclePhase::Success);
}

#[tokio::test]
async fn test_result_arriving_after_reset_is_discarded() {
    let generator = Arc::new(FakeGenerator::gated());
    generator.push_success(video_result(b"late", "files/late"));
    let controller = Arc::new(controller_for(&generator));

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit(text_params("slow clouds")).await }
    });
    wait_until(&controller, |s| s.phase == LifecyclePhase::Loading).await;

    controller.reset_to_idle();
    generator.release();

    assert_eq!(pending.await.unwrap(), SubmitOutcome::Superseded);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Idle);
    assert!(snapshot.result.is_none());
    assert!(snapshot.error.is_none());
    assert!(snapshot.last_parameters.is_none());

    // The controller accepts new work afterwards.
    generator.push_success(video_result(b"fresh", "files/fresh"));
    generator.release();
    assert_eq!(
        controller.submit(text_params("fast clouds")).await,
        SubmitOutcome::Succeeded
    );
    assert_eq!(
        controller.snapshot().result.unwrap().video_ref.as_str(),
        "files/fresh"
    );
}

#[tokio::test]
async fn test_failure_arriving_after_reset_does_not_reauthorize() {
    let generator = Arc::new(FakeGenerator::gated());
    generator.push_failure("400 API_KEY_INVALID");
    let credentials = Arc::new(FakeCredentials::holding_key());
    let controller = Arc::new(controller_with_credentials(&generator, &credentials));

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit(text_params("rain")).await }
    });
    wait_until(&controller, |s| s.phase == LifecyclePhase::Loading).await;
    controller.reset_to_idle();
    generator.release();

    assert_eq!(pending.await.unwrap(), SubmitOutcome::Superseded);
    assert_eq!(controller.phase(), LifecyclePhase::Idle);
    assert_eq!(credentials.invalidations(), 0);
    assert_eq!(credentials.selections(), 0);
    assert!(!controller.snapshot().reauthorization_required);
}

#[tokio::test]
async fn test_progress_after_settlement_is_ignored() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_success(video_result(b"v", "files/v"));
    let controller = controller_for(&generator);

    controller.submit(text_params("waves")).await;
    generator.reporter(0).report("Still polling...");

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Success);
    assert!(snapshot.progress_message.is_none());
}

#[tokio::test]
async fn test_retry_resubmits_identical_parameters() {
    let generator = Arc::new(FakeGenerator::new());
    generator
        .push_failure("backend exploded")
        .push_failure("backend exploded again")
        .push_success(video_result(b"ok", "files/ok"));
    let controller = controller_for(&generator);

    let outcome = controller.submit(text_params("a lighthouse at dusk")).await;
    assert_eq!(outcome, SubmitOutcome::Failed(ErrorKind::Generic));
    let error = controller.snapshot().error.unwrap();
    assert_eq!(error.kind, ErrorKind::Generic);
    assert_eq!(
        error.message,
        "Video generation failed: Provider error: backend exploded"
    );

    assert_eq!(
        controller.retry().await,
        SubmitOutcome::Failed(ErrorKind::Generic)
    );
    assert_eq!(controller.retry().await, SubmitOutcome::Succeeded);

    let calls = generator.calls();
    assert_eq!(calls.len(), 3);
    assert!(Arc::ptr_eq(&calls[0], &calls[1]));
    assert!(Arc::ptr_eq(&calls[1], &calls[2]));
    assert!(Arc::ptr_eq(
        &calls[2],
        &controller.snapshot().last_parameters.unwrap()
    ));
    assert_eq!(*calls[0], text_params("a lighthouse at dusk"));
    assert!(controller.snapshot().error.is_none());
}

#[tokio::test]
async fn test_retry_without_previous_submission_is_rejected() {
    let generator = Arc::new(FakeGenerator::new());
    let controller = controller_for(&generator);

    assert_eq!(controller.retry().await, SubmitOutcome::Rejected);
    assert_eq!(controller.phase(), LifecyclePhase::Idle);
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_key_failure_runs_key_selection() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_failure("403 PERMISSION_DENIED: Permission denied on resource");
    let credentials = Arc::new(FakeCredentials::holding_key());
    let controller = controller_with_credentials(&generator, &credentials);

    let outcome = controller.submit(text_params("desert")).await;

    assert_eq!(
        outcome,
        SubmitOutcome::Failed(ErrorKind::InvalidOrUnauthorizedKey)
    );
    assert_eq!(credentials.invalidations(), 1);
    assert_eq!(credentials.selections(), 1);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Error);
    assert!(snapshot.error.unwrap().message.contains("API key is invalid"));
    assert!(!snapshot.reauthorization_required);
}

#[tokio::test]
async fn test_not_found_failure_runs_key_selection() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_failure("404 NOT_FOUND: Requested entity was not found.");
    let credentials = Arc::new(FakeCredentials::holding_key());
    let controller = controller_with_credentials(&generator, &credentials);

    let outcome = controller.submit(text_params("forest")).await;

    assert_eq!(outcome, SubmitOutcome::Failed(ErrorKind::ModelOrKeyNotFound));
    assert_eq!(credentials.selections(), 1);
    assert!(controller
        .snapshot()
        .error
        .unwrap()
        .message
        .contains("billing enabled"));
}

#[tokio::test]
async fn test_cancelled_reauthorization_is_retried_on_next_submit() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_failure("API_KEY_INVALID");
    let credentials = Arc::new(FakeCredentials::new(true, false));
    let controller = controller_with_credentials(&generator, &credentials);

    controller.submit(text_params("snow")).await;
    assert!(controller.snapshot().reauthorization_required);
    assert_eq!(credentials.selections(), 1);

    let outcome = controller.submit(text_params("snow")).await;

    assert_eq!(outcome, SubmitOutcome::Failed(ErrorKind::Generic));
    assert_eq!(credentials.selections(), 2);
    assert_eq!(generator.calls().len(), 1);
    let snapshot = controller.snapshot();
    assert!(snapshot.reauthorization_required);
    assert!(snapshot.error.unwrap().message.contains("No API key available"));
}

#[tokio::test]
async fn test_missing_key_is_selected_before_generation() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_success(video_result(b"v", "files/v"));
    let credentials = Arc::new(FakeCredentials::new(false, true));
    let controller = controller_with_credentials(&generator, &credentials);

    assert_eq!(
        controller.submit(text_params("meadow")).await,
        SubmitOutcome::Succeeded
    );
    assert_eq!(credentials.selections(), 1);
    assert_eq!(generator.calls().len(), 1);
}

#[tokio::test]
async fn test_submissions_wait_for_pending_key_selection() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_failure("400 API_KEY_INVALID");
    let credentials = Arc::new(FakeCredentials::gated_holding_key());
    let controller = Arc::new(controller_with_credentials(&generator, &credentials));

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit(text_params("glacier")).await }
    });
    wait_until(&controller, |s| s.phase == LifecyclePhase::Error).await;
    for _ in 0..100 {
        if credentials.selections() == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(credentials.selections(), 1);

    assert_eq!(controller.retry().await, SubmitOutcome::Rejected);
    assert_eq!(
        controller.submit(text_params("glacier at noon")).await,
        SubmitOutcome::Rejected
    );
    assert!(controller.reauthorize().await.is_err());
    assert_eq!(controller.phase(), LifecyclePhase::Error);
    assert_eq!(generator.calls().len(), 1);

    credentials.release();
    assert_eq!(
        first.await.unwrap(),
        SubmitOutcome::Failed(ErrorKind::InvalidOrUnauthorizedKey)
    );
    assert_eq!(credentials.selections(), 1);
    assert_eq!(credentials.peak_concurrent_selections(), 1);
    assert!(!controller.snapshot().reauthorization_required);

    // Once the key is chosen, retry goes straight to the generator.
    generator.push_success(video_result(b"v", "files/v"));
    assert_eq!(controller.retry().await, SubmitOutcome::Succeeded);
    assert_eq!(credentials.selections(), 1);
    assert_eq!(generator.calls().len(), 2);
}

#[tokio::test]
async fn test_auth_failure_without_credential_flow_leaves_no_pending_reauthorization() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_failure("API_KEY_INVALID");
    let controller = controller_for(&generator);

    let outcome = controller.submit(text_params("tundra")).await;

    assert_eq!(
        outcome,
        SubmitOutcome::Failed(ErrorKind::InvalidOrUnauthorizedKey)
    );
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Error);
    assert!(!snapshot.reauthorization_required);
    assert!(controller.reauthorize().await.is_ok());
}

#[tokio::test]
async fn test_reauthorization_flag_survives_reset() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_failure("API key not valid. Please pass a valid API key.");
    let credentials = Arc::new(FakeCredentials::new(true, false));
    let controller = controller_with_credentials(&generator, &credentials);

    controller.submit(text_params("harbor")).await;
    controller.reset_to_idle();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Idle);
    assert!(snapshot.reauthorization_required);
}

#[tokio::test]
async fn test_prepare_retry_from_error_seeds_last_parameters() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_failure("quota exhausted");
    let controller = controller_for(&generator);

    controller.submit(text_params("mountains")).await;
    assert_eq!(controller.phase(), LifecyclePhase::Error);

    controller.prepare_retry_from_error();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Idle);
    assert!(snapshot.error.is_none());
    let last = snapshot.last_parameters.unwrap();
    let seed = controller.take_pending_seed().unwrap();
    assert!(Arc::ptr_eq(&seed, &last));
    assert!(controller.take_pending_seed().is_none());
}

#[tokio::test]
async fn test_prepare_retry_without_history_resets() {
    let generator = Arc::new(FakeGenerator::new());
    let controller = controller_for(&generator);

    controller.prepare_retry_from_error();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, LifecyclePhase::Idle);
    assert!(snapshot.pending_seed.is_none());
}

#[tokio::test]
async fn test_acknowledge_error_only_applies_in_error() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_failure("boom");
    let controller = controller_for(&generator);

    assert!(!controller.acknowledge_error());

    controller.submit(text_params("city")).await;
    assert!(controller.acknowledge_error());
    assert_eq!(controller.phase(), LifecyclePhase::Idle);
    assert_eq!(controller.take_pending_seed().unwrap().prompt, "city");
}

#[tokio::test]
async fn test_subscribers_observe_final_snapshot() {
    let generator = Arc::new(FakeGenerator::new());
    generator.push_success(video_result(b"v", "files/v"));
    let controller = controller_for(&generator);
    let events = controller.subscribe();

    controller.submit(text_params("river")).await;

    let latest = events.borrow().clone();
    assert_eq!(latest.phase, LifecyclePhase::Success);
    assert!(latest.result.is_some());
}
