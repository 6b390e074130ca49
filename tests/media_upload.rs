//! Integration tests for the buffer upload entry point.
//!
//! Verifies that:
//! - Video buffers go to `/{cloud_name}/video/upload` with `format=mp4`
//! - Raw buffers go to `/{cloud_name}/raw/upload` with `format=mp3`
//! - The returned secure URL is exactly what the host produced
//! - A host error passes through unmodified in the upload error
//!
//! Uses wiremock as the media host and drives `MediaHost` directly.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reelforge::config::{ApiKey, MediaHostConfig};
use reelforge::upload::{MediaHost, ResourceKind};
use reelforge::Error;

fn media_host(upload_url: &str) -> MediaHost {
    let config = MediaHostConfig {
        cloud_name: "testcloud".to_string(),
        api_key: "media-key".to_string(),
        api_secret: Some(ApiKey::from("media-secret")),
        upload_url: upload_url.to_string(),
        image_folder: "ai_generated_images".to_string(),
        media_folder: "reelforge_media".to_string(),
    };
    MediaHost::new(reqwest::Client::new(), config)
}

#[tokio::test]
async fn video_buffer_uploads_as_mp4() {
    let media_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/testcloud/video/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "secure_url": "https://cdn.example.com/reelforge_media/clip_1.mp4",
        })))
        .expect(1)
        .mount(&media_server)
        .await;

    let host = media_host(&media_server.uri());
    let url = host
        .upload_buffer(vec![0x00, 0x00, 0x00, 0x18], "clip_1", ResourceKind::Video)
        .await
        .expect("upload should succeed");

    assert_eq!(
        url, "https://cdn.example.com/reelforge_media/clip_1.mp4",
        "must return exactly the URL the media host produced"
    );

    let requests = media_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(body.contains("mp4"), "format field missing: {}", body);
    assert!(body.contains("reelforge_media"), "folder missing");
    assert!(body.contains("clip_1"), "public id missing");
    assert!(body.contains("media-key"), "api key missing");
    assert!(body.contains("signature"), "signature missing");
}

#[tokio::test]
async fn raw_buffer_uploads_as_mp3() {
    let media_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/testcloud/raw/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "secure_url": "https://cdn.example.com/reelforge_media/narration_1.mp3",
        })))
        .expect(1)
        .mount(&media_server)
        .await;

    let host = media_host(&media_server.uri());
    let url = host
        .upload_buffer(vec![0xFF, 0xFB, 0x90, 0x00], "narration_1", ResourceKind::Raw)
        .await
        .expect("upload should succeed");

    assert_eq!(
        url,
        "https://cdn.example.com/reelforge_media/narration_1.mp3"
    );

    let requests = media_server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(body.contains("mp3"), "format field missing: {}", body);
}

#[tokio::test]
async fn image_buffer_uploads_as_png() {
    let media_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/testcloud/image/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "secure_url": "https://cdn.example.com/reelforge_media/frame_1.png",
        })))
        .expect(1)
        .mount(&media_server)
        .await;

    let host = media_host(&media_server.uri());
    let url = host
        .upload_buffer(vec![0x89, 0x50, 0x4E, 0x47], "frame_1", ResourceKind::Image)
        .await
        .expect("upload should succeed");

    assert_eq!(url, "https://cdn.example.com/reelforge_media/frame_1.png");

    let requests = media_server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(body.contains("png"), "format field missing: {}", body);
}

#[tokio::test]
async fn host_error_passes_through_unmodified() {
    let media_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/testcloud/video/upload"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid video format"))
        .mount(&media_server)
        .await;

    let host = media_host(&media_server.uri());
    let err = host
        .upload_buffer(vec![0x00], "clip_bad", ResourceKind::Video)
        .await
        .unwrap_err();

    match err {
        Error::Upload(details) => {
            assert!(
                details.contains("Invalid video format"),
                "host error body must pass through unmodified: {}",
                details
            );
        }
        other => panic!("expected Upload error, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_secret_fails_before_any_request() {
    let media_server = MockServer::start().await;
    // No mock mounted: an outbound call would 404 against wiremock, but
    // signing must fail first without touching the network.

    let config = MediaHostConfig {
        cloud_name: "testcloud".to_string(),
        api_key: "media-key".to_string(),
        api_secret: None,
        upload_url: media_server.uri(),
        image_folder: "ai_generated_images".to_string(),
        media_folder: "reelforge_media".to_string(),
    };
    let host = MediaHost::new(reqwest::Client::new(), config);

    let err = host
        .upload_buffer(vec![0x00], "clip_1", ResourceKind::Video)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upload(_)));

    let requests = media_server.received_requests().await.unwrap();
    assert!(requests.is_empty(), "no request should reach the host");
}
