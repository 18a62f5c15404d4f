//! Stream cache API integration tests.
//!
//! Every test runs a [`TestHarness`] server on a random port backed by the
//! in-memory artifact store and recording fakes.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{post_cache, TestHarness, BUCKET, CDN};

// ---------------------------------------------------------------------------
// Cache hits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cached_artifact_returns_stream_url_without_work() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.publish("clip.m3u8");

    let resp = post_cache(addr, json!({ "videoUrl": "https://cdn/ex/clip-mobile.mp4" })).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "streamUrl": format!("{CDN}/clip.m3u8") }));
    assert_eq!(harness.fetcher.calls(), 0);
    assert_eq!(harness.transcoder.calls(), 0);
    assert!(harness.store.uploads().is_empty());
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_mp4_url_is_rejected() {
    let (harness, addr) = TestHarness::with_server().await;

    let resp = post_cache(addr, json!({ "videoUrl": "https://cdn/ex/clip.mov" })).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid MP4 URL" }));
    assert_eq!(harness.store.exists_calls(), 0);
}

#[tokio::test]
async fn missing_or_non_string_video_url_is_rejected() {
    let (_harness, addr) = TestHarness::with_server().await;

    for body in [json!({}), json!({ "videoUrl": 7 }), json!({ "videoUrl": "" })] {
        let resp = post_cache(addr, body.clone()).await;
        assert_eq!(resp.status(), 400, "body={body}");
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["error"], "Invalid MP4 URL");
    }
}

#[tokio::test]
async fn malformed_json_is_rejected_as_invalid_url() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/cache"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Invalid MP4 URL");
}

#[tokio::test]
async fn url_without_name_is_rejected() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = post_cache(addr, json!({ "videoUrl": "https://cdn/ex/.mp4" })).await;

    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json, json!({ "error": "Cannot extract name from URL" }));
}

// ---------------------------------------------------------------------------
// Cache misses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn miss_converts_uploads_and_cleans_up() {
    let (harness, addr) = TestHarness::with_server().await;

    let resp = post_cache(addr, json!({ "videoUrl": "https://cdn/ex/clip.mp4" })).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["streamUrl"], format!("{CDN}/clip.m3u8"));

    assert_eq!(harness.fetcher.calls(), 1);
    assert_eq!(harness.transcoder.calls(), 1);
    assert_eq!(
        harness.store.uploads(),
        vec!["clip0.ts", "clip1.ts", "clip.m3u8"]
    );
    assert!(harness.store.get(BUCKET, "clip.mp4").is_none());
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn second_request_hits_the_cache() {
    let (harness, addr) = TestHarness::with_server().await;

    let first = post_cache(addr, json!({ "videoUrl": "https://a.example/clip.mp4" })).await;
    let second = post_cache(addr, json!({ "videoUrl": "https://b.example/v/clip-mobile.mp4" })).await;

    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 200);
    let a: serde_json::Value = first.json().await.unwrap();
    let b: serde_json::Value = second.json().await.unwrap();
    assert_eq!(a, b);
    assert_eq!(harness.transcoder.calls(), 1);
}

#[tokio::test]
async fn concurrent_requests_transcode_once() {
    let (harness, addr) = TestHarness::with_server().await;

    let (a, b, c) = tokio::join!(
        post_cache(addr, json!({ "videoUrl": "https://cdn/ex/clip.mp4" })),
        post_cache(addr, json!({ "videoUrl": "https://cdn/ex/clip.mp4" })),
        post_cache(addr, json!({ "videoUrl": "https://cdn/ex/clip-mobile.mp4" })),
    );

    assert_eq!(a.status(), 200);
    assert_eq!(b.status(), 200);
    assert_eq!(c.status(), 200);
    assert_eq!(harness.transcoder.calls(), 1);
    assert!(harness.scratch_is_empty());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_failure_is_500_and_skips_fetch() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.store.fail_exists("AccessDenied: not authorized");

    let resp = post_cache(addr, json!({ "videoUrl": "https://cdn/ex/clip.mp4" })).await;

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Conversion failed");
    assert!(body["details"].as_str().unwrap().contains("AccessDenied"));
    assert_eq!(harness.fetcher.calls(), 0);
}

#[tokio::test]
async fn upload_failure_is_500_and_manifest_is_not_published() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.store.fail_put_for("clip1.ts");

    let resp = post_cache(addr, json!({ "videoUrl": "https://cdn/ex/clip.mp4" })).await;

    assert_eq!(resp.status(), 500);
    assert!(harness.store.get(BUCKET, "clip.m3u8").is_none());
    assert!(harness.scratch_is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn encoder_failure_reports_stderr_and_cleans_up() {
    let bin = tempfile::tempdir().unwrap();
    let script = common::fake_ffmpeg(
        bin.path(),
        "echo 'moov atom not found' >&2\nexit 1",
    );
    let transcoder = hc_av::FfmpegTranscoder::new(script, hc_av::HlsSettings::default());
    let (harness, addr) = TestHarness::with_transcoder(Arc::new(transcoder)).serve().await;

    let resp = post_cache(addr, json!({ "videoUrl": "https://cdn/ex/broken.mp4" })).await;

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Conversion failed");
    assert!(
        body["details"].as_str().unwrap().contains("moov atom not found"),
        "{body}"
    );
    assert!(harness.store.uploads().is_empty());
    assert!(harness.scratch_is_empty());
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookup_reports_existence() {
    let (harness, addr) = TestHarness::with_server().await;
    let url = format!("http://{addr}/api/cache?videoUrl=https://cdn/ex/clip-mobile.mp4");

    let before: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(
        before,
        json!({
            "streamUrl": format!("{CDN}/clip.m3u8"),
            "artifactKey": "clip.m3u8",
            "exists": false,
        })
    );

    harness.publish("clip.m3u8");
    let after: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(after["exists"], true);

    assert_eq!(harness.fetcher.calls(), 0);
}

#[tokio::test]
async fn lookup_validates_url() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/cache?videoUrl=https://cdn/x.webm"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = reqwest::get(format!("http://{addr}/api/cache")).await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn undecodable_lookup_query_is_json_400() {
    let (harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!(
        "http://{addr}/api/cache?videoUrl=https://cdn/a.mp4&videoUrl=https://cdn/b.mp4"
    ))
    .await
    .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid MP4 URL" }));
    assert_eq!(harness.store.exists_calls(), 0);
}

#[tokio::test]
async fn lookup_store_failure_is_500() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.store.fail_exists("SlowDown");

    let resp = reqwest::get(format!("http://{addr}/api/cache?videoUrl=https://cdn/clip.mp4"))
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Lookup failed");
}

// ---------------------------------------------------------------------------
// Health, metrics, request ids
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn metrics_endpoint_responds_without_recorder() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("No metrics recorder"));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let (_harness, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let generated = client
        .post(format!("http://{addr}/api/cache"))
        .json(&json!({ "videoUrl": "bad" }))
        .send()
        .await
        .unwrap();
    assert!(generated.headers().contains_key("x-request-id"));

    let echoed = client
        .get(format!("http://{addr}/health"))
        .header("x-request-id", "trace-me-42")
        .send()
        .await
        .unwrap();
    assert_eq!(echoed.headers()["x-request-id"], "trace-me-42");
}
