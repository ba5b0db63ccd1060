mod helpers;

use helpers::{FakeApi, Reply, UPLOAD_TOKEN, VID};
use std::time::Duration;
use video_upload::errors::UploadError;
use video_upload::services::VideoRegistrar;
use video_upload::services::video_registrar::{COMPLETE_ACTION, SAVE_ACTION};
use video_upload::{VideoData, VideoMetadata};

fn uploaded() -> VideoData {
    VideoData {
        vid: VID.into(),
        upload_token: UPLOAD_TOKEN.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn confirmation_survives_four_failures() {
    let api = FakeApi::new();
    for _ in 0..4 {
        api.script(COMPLETE_ACTION, Reply::Fail("connection reset".into()));
    }
    let registrar = VideoRegistrar::new(api.clone(), 5, Duration::ZERO);

    let confirmed = registrar.complete(&uploaded()).await.unwrap();

    assert_eq!(confirmed.vid, VID);
    assert_eq!(api.calls(COMPLETE_ACTION), 5);
}

#[tokio::test]
async fn confirmation_gives_up_after_five_attempts() {
    let api = FakeApi::new();
    for _ in 0..5 {
        api.script(COMPLETE_ACTION, Reply::vendor_error(-50001, "video not ready"));
    }
    let registrar = VideoRegistrar::new(api.clone(), 5, Duration::ZERO);

    let err = registrar.complete(&uploaded()).await.unwrap_err();

    match err {
        UploadError::ConfirmationExhausted { attempts, last_error } => {
            assert_eq!(attempts, 5);
            assert!(last_error.contains("video not ready"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(api.calls(COMPLETE_ACTION), 5);
}

#[tokio::test]
async fn empty_confirmation_is_retried() {
    let api = FakeApi::new();
    api.script(COMPLETE_ACTION, Reply::empty_data());
    let registrar = VideoRegistrar::new(api.clone(), 5, Duration::ZERO);

    registrar.complete(&uploaded()).await.unwrap();

    assert_eq!(api.calls(COMPLETE_ACTION), 2);
}

#[tokio::test]
async fn confirmation_carries_alternate_location() {
    let api = FakeApi::new();
    let registrar = VideoRegistrar::new(api.clone(), 5, Duration::ZERO);
    let data = VideoData {
        ow_oss_bucket: "owned-bucket".into(),
        ow_oss_object: "uploads/clip.mp4".into(),
        ..uploaded()
    };

    registrar.complete(&data).await.unwrap();

    let params = &api.params(COMPLETE_ACTION)[0];
    assert_eq!(params["upload_token"], UPLOAD_TOKEN);
    assert_eq!(params["ow_oss_bucket"], "owned-bucket");
    assert_eq!(params["ow_oss_object"], "uploads/clip.mp4");
}

#[tokio::test]
async fn save_failure_is_final_and_skips_confirmation() {
    let api = FakeApi::new();
    api.script(SAVE_ACTION, Reply::vendor_error(-2001, "title is required"));
    let registrar = VideoRegistrar::new(api.clone(), 5, Duration::ZERO);

    let err = registrar
        .register_and_confirm(&VideoMetadata::new("", "tag"), &uploaded())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::SaveFailed(ref msg) if msg.contains("title is required")));
    assert_eq!(api.calls(SAVE_ACTION), 1);
    assert_eq!(api.calls(COMPLETE_ACTION), 0);
}

#[tokio::test]
async fn unset_metadata_fields_are_not_sent() {
    let api = FakeApi::new();
    let registrar = VideoRegistrar::new(api.clone(), 5, Duration::ZERO);

    registrar
        .save(&VideoMetadata::new("Holiday", "travel"), UPLOAD_TOKEN)
        .await
        .unwrap();

    let params = &api.params(SAVE_ACTION)[0];
    assert!(!params.contains_key("description"));
    assert!(!params.contains_key("category_name"));
    assert_eq!(params["upload_token"], UPLOAD_TOKEN);
}
