//! Agent completion webhook integration tests.

mod common;

use axum::http::{HeaderName, HeaderValue};
use common::{TestHarness, CHANNEL};
use serde_json::{json, Value};
use thryve_service::crypto::hmac_sha256_hex;

const SECRET: &str = "whsec_agent";

/// Submit a thumbnail job accepted as `request_id` and return its record id.
async fn submit_thumbnail(harness: &TestHarness, request_id: &str) -> String {
    harness.accept_job("/Thumbnail_Make", request_id).await;
    let body: Value = harness
        .post(
            "/v1/thumbnails",
            &json!({ "channelId": CHANNEL, "images": ["https://cdn.example/face.png"] }),
        )
        .await
        .json();
    body["id"].as_str().unwrap().to_string()
}

async fn job(harness: &TestHarness, id: &str) -> Value {
    harness.get(&format!("/v1/jobs/{id}")).await.json()
}

fn signature_header() -> HeaderName {
    HeaderName::from_static("x-webhook-signature")
}

#[tokio::test]
async fn unknown_request_id_is_not_found() {
    let harness = TestHarness::new().await;

    let response = harness
        .callback(&json!({ "request_id": "nope", "status": "OK" }))
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"], "No matching record found for request_id");
}

#[tokio::test]
async fn non_ok_status_fails_the_job_without_refund() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;
    let id = submit_thumbnail(&harness, "t1").await;

    harness
        .callback(&json!({ "request_id": "t1", "status": "ERROR" }))
        .await
        .assert_status_ok();

    let job = job(&harness, &id).await;
    assert_eq!(job["status"], "FAILED");
    assert!(job["url"].is_null());
    assert_eq!(harness.balance().await, 35);
}

#[tokio::test]
async fn padded_ok_status_fails_the_job() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;
    let id = submit_thumbnail(&harness, "t1").await;

    harness
        .callback(&json!({
            "request_id": "t1",
            "status": " OK ",
            "payload": { "images": [{ "url": "https://cdn.example/one.png" }] }
        }))
        .await
        .assert_status_ok();

    assert_eq!(job(&harness, &id).await["status"], "FAILED");
}

#[tokio::test]
async fn oddly_typed_fields_do_not_block_correlation() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;
    let id = submit_thumbnail(&harness, "g1").await;

    harness
        .callback(&json!({
            "request_id": { "unexpected": true },
            "gateway_request_id": "g1",
            "status": "ok",
            "payload": {
                "images": "https://cdn.example/not-a-list.png",
                "video": [{ "url": "https://cdn.example/clip.mp4" }]
            }
        }))
        .await
        .assert_status_ok();

    let job = job(&harness, &id).await;
    assert_eq!(job["status"], "COMPLETED");
    assert_eq!(job["url"], "https://cdn.example/clip.mp4");
}

#[tokio::test]
async fn redelivery_does_not_change_a_finished_job() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;
    let id = submit_thumbnail(&harness, "t1").await;

    let first = json!({
        "request_id": "t1",
        "status": "OK",
        "payload": { "images": [{ "url": "https://cdn.example/one.png" }] }
    });
    harness.callback(&first).await.assert_status_ok();
    let completed = job(&harness, &id).await;

    harness.callback(&first).await.assert_status_ok();
    harness
        .callback(&json!({
            "request_id": "t1",
            "status": "ERROR",
            "payload": { "images": [{ "url": "https://cdn.example/two.png" }] }
        }))
        .await
        .assert_status_ok();

    let after = job(&harness, &id).await;
    assert_eq!(after["status"], "COMPLETED");
    assert_eq!(after["url"], "https://cdn.example/one.png");
    assert_eq!(after["updatedAt"], completed["updatedAt"]);
}

#[tokio::test]
async fn gateway_request_id_is_used_as_fallback() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;
    let id = submit_thumbnail(&harness, "g1").await;

    harness
        .callback(&json!({
            "gateway_request_id": "g1",
            "status": "OK",
            "payload": { "images": [{ "url": "https://cdn.example/g.png" }] }
        }))
        .await
        .assert_status_ok();

    assert_eq!(job(&harness, &id).await["status"], "COMPLETED");
}

#[tokio::test]
async fn malformed_callbacks_are_rejected() {
    let harness = TestHarness::new().await;

    harness
        .callback(&json!({ "status": "OK" }))
        .await
        .assert_status_bad_request();

    harness
        .server
        .post("/webhooks/agent")
        .text("not json")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn legacy_path_is_accepted() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;
    let id = submit_thumbnail(&harness, "t1").await;

    harness
        .server
        .post("/api/webhook")
        .json(&json!({
            "request_id": "t1",
            "status": "OK",
            "payload": { "images": [{ "url": "https://cdn.example/t.png" }] }
        }))
        .await
        .assert_status_ok();

    assert_eq!(job(&harness, &id).await["status"], "COMPLETED");
}

#[tokio::test]
async fn signed_callbacks_are_verified() {
    let harness =
        TestHarness::with_config(|c| c.agent_webhook_secret = Some(SECRET.into())).await;
    harness.seed_user(50).await;
    let id = submit_thumbnail(&harness, "t1").await;

    let body = json!({
        "request_id": "t1",
        "status": "OK",
        "payload": { "images": [{ "url": "https://cdn.example/t.png" }] }
    })
    .to_string();

    harness
        .server
        .post("/webhooks/agent")
        .text(body.clone())
        .await
        .assert_status_unauthorized();

    harness
        .server
        .post("/webhooks/agent")
        .add_header(signature_header(), HeaderValue::from_static("deadbeef"))
        .text(body.clone())
        .await
        .assert_status_unauthorized();

    assert_eq!(job(&harness, &id).await["status"], "PROCESSING");

    let signature = format!("sha256={}", hmac_sha256_hex(SECRET, body.as_bytes()));
    harness
        .server
        .post("/webhooks/agent")
        .add_header(signature_header(), HeaderValue::from_str(&signature).unwrap())
        .text(body)
        .await
        .assert_status_ok();

    assert_eq!(job(&harness, &id).await["status"], "COMPLETED");
}
