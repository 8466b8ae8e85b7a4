//! Video comment critique integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};
use thryve_service::agent::types::COMMENT_CRITIQUE_PROMPT;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

const VIDEO: &str = "dQw4w9WgXcQ";

#[tokio::test]
async fn critique_returns_shaped_reply_without_charge() {
    let harness = TestHarness::new().await;
    harness.seed_user(3).await;

    Mock::given(method("POST"))
        .and(path("/Analyze_Single_Video_Comments"))
        .and(body_json(json!({ "Prompt": COMMENT_CRITIQUE_PROMPT, "yt_video_id": VIDEO })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "Output": { "reply": {
                "response_text": "Viewers find the intro too long.",
                "Overall Sentiment:": "Mostly positive",
                "Top Negative Themes": ["long intro", "quiet audio"]
            } } }
        })))
        .expect(1)
        .mount(&harness.analysis_agent)
        .await;

    let response = harness
        .post("/v1/videos/comments/critique", &json!({ "ytVideoId": VIDEO }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["responseText"], "Viewers find the intro too long.");
    assert_eq!(body["overallSentiment"], "Mostly positive");
    assert_eq!(body["sentimentBreakdown"], "0% Positive | 0% Neutral | 0% Negative");
    assert_eq!(body["topNegativeThemes"][1], "quiet audio");
    assert_eq!(body["topPositiveThemes"], json!([]));
    assert_eq!(body["trend"], "Analysis completed");
    assert_eq!(harness.balance().await, 3);
}

#[tokio::test]
async fn critique_accepts_snake_case_video_id() {
    let harness = TestHarness::new().await;
    harness.seed_user(0).await;

    Mock::given(method("POST"))
        .and(path("/Analyze_Single_Video_Comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "Output": { "reply": "Add captions." } }
        })))
        .mount(&harness.analysis_agent)
        .await;

    let body: Value = harness
        .post("/v1/videos/comments/critique", &json!({ "yt_video_id": VIDEO }))
        .await
        .json();

    assert_eq!(body["responseText"], "Add captions.");
    assert_eq!(body["overallSentiment"], "Unknown");
}

#[tokio::test]
async fn critique_agent_failure_is_bad_gateway_with_details() {
    let harness = TestHarness::new().await;
    harness.seed_user(0).await;

    Mock::given(method("POST"))
        .and(path("/Analyze_Single_Video_Comments"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "quota exceeded" })),
        )
        .mount(&harness.analysis_agent)
        .await;

    let response = harness
        .post("/v1/videos/comments/critique", &json!({ "ytVideoId": VIDEO }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "External agent error");
    assert_eq!(body["details"]["message"], "quota exceeded");
}

#[tokio::test]
async fn critique_requires_video_id() {
    let harness = TestHarness::new().await;
    harness.seed_user(0).await;

    harness
        .post("/v1/videos/comments/critique", &json!({ "ytVideoId": "  " }))
        .await
        .assert_status_bad_request();

    harness
        .post("/v1/videos/comments/critique", &json!({}))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn critique_without_analysis_agent_is_not_configured() {
    let harness = TestHarness::with_config(|c| c.analysis_agent_url = None).await;
    harness.seed_user(0).await;

    harness
        .post("/v1/videos/comments/critique", &json!({ "ytVideoId": VIDEO }))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}
