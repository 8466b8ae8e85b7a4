//! Competitor discovery and CTR prediction integration tests.

mod common;

use axum::http::StatusCode;
use common::{TestHarness, CHANNEL};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn competitors(list: Value) -> Value {
    json!({ "result": { "Output": { "competitors": { "videoList": list } } } })
}

async fn mount_competitors(harness: &TestHarness, list: Value) {
    Mock::given(method("POST"))
        .and(path("/competitor_find"))
        .respond_with(ResponseTemplate::new(200).set_body_json(competitors(list)))
        .up_to_n_times(1)
        .mount(&harness.analysis_agent)
        .await;
}

async fn discover(harness: &TestHarness) -> axum_test::TestResponse {
    harness
        .post(
            "/v1/channels/similar/discover",
            &json!({ "ownerChannelId": CHANNEL }),
        )
        .await
}

async fn similar(harness: &TestHarness) -> Vec<Value> {
    let body: Value = harness
        .get(&format!("/v1/channels/similar?ownerChannelId={CHANNEL}"))
        .await
        .json();
    body["similar"].as_array().unwrap().clone()
}

// ============================================================================
// Discovery
// ============================================================================

#[tokio::test]
async fn discovery_stores_ranked_competitors() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;

    Mock::given(method("POST"))
        .and(path("/competitor_find"))
        .and(body_json(json!({ "yt_channel_id": CHANNEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(competitors(json!([
            { "rank": 2, "channel_id": "UC_b", "relevance_score": "medium" },
            { "rank": 1, "channel_id": "UC_a", "relevance_score": "high", "reasoning": "same niche" },
            { "rank": 3, "channel_name": "no id" }
        ]))))
        .expect(1)
        .mount(&harness.analysis_agent)
        .await;

    let response = discover(&harness).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["similarCount"], 2);
    assert_eq!(harness.balance().await, 30);

    let rows = similar(&harness).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["similarChannelId"], "UC_a");
    assert_eq!(rows[0]["relevanceScore"], "high");
    assert_eq!(rows[0]["reasoning"], "same niche");
    assert_eq!(rows[1]["similarChannelId"], "UC_b");
}

#[tokio::test]
async fn rediscovery_updates_in_place() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;

    mount_competitors(
        &harness,
        json!([
            { "rank": 1, "channel_id": "UC_a", "relevance_score": "high" },
            { "rank": 2, "channel_id": "UC_b", "relevance_score": "medium" }
        ]),
    )
    .await;
    discover(&harness).await.assert_status_ok();

    mount_competitors(
        &harness,
        json!([{ "rank": 1, "channel_id": "UC_b", "relevance_score": "high" }]),
    )
    .await;
    discover(&harness).await.assert_status_ok();

    let rows = similar(&harness).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["similarChannelId"], "UC_a");
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[1]["similarChannelId"], "UC_b");
    assert_eq!(rows[1]["rank"], 1);
    assert_eq!(rows[1]["relevanceScore"], "high");
    assert_eq!(harness.balance().await, 10);
}

#[tokio::test]
async fn empty_discovery_is_still_charged() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;

    Mock::given(method("POST"))
        .and(path("/competitor_find"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .mount(&harness.analysis_agent)
        .await;

    let body: Value = discover(&harness).await.json();
    assert_eq!(body["similarCount"], 0);
    assert_eq!(harness.balance().await, 30);
    assert!(similar(&harness).await.is_empty());
}

#[tokio::test]
async fn discovery_failure_is_refunded() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;

    Mock::given(method("POST"))
        .and(path("/competitor_find"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&harness.analysis_agent)
        .await;

    discover(&harness)
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(harness.balance().await, 50);
}

#[tokio::test]
async fn concurrent_discovery_never_overdraws() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;

    Mock::given(method("POST"))
        .and(path("/competitor_find"))
        .respond_with(ResponseTemplate::new(200).set_body_json(competitors(json!([]))))
        .mount(&harness.analysis_agent)
        .await;

    let responses = futures::future::join_all((0..5).map(|_| discover(&harness))).await;

    let charged = responses
        .iter()
        .filter(|r| r.status_code() == StatusCode::OK)
        .count();
    let refused = responses
        .iter()
        .filter(|r| r.status_code() == StatusCode::PAYMENT_REQUIRED)
        .count();
    assert_eq!((charged, refused), (2, 3));
    assert_eq!(harness.balance().await, 10);
}

#[tokio::test]
async fn discovery_requires_owned_channel() {
    let harness = TestHarness::new().await;
    harness.seed_user(50).await;

    harness
        .post(
            "/v1/channels/similar/discover",
            &json!({ "ownerChannelId": "UC_someone_else" }),
        )
        .await
        .assert_status_not_found();

    harness
        .get("/v1/channels/similar?ownerChannelId=UC_someone_else")
        .await
        .assert_status_not_found();

    assert_eq!(harness.balance().await, 50);
}

// ============================================================================
// CTR prediction
// ============================================================================

#[tokio::test]
async fn ctr_prediction_returns_agent_output() {
    let harness = TestHarness::new().await;
    harness.seed_user(12).await;

    Mock::given(method("POST"))
        .and(path("/CTR_Predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "Output": { "ctr": 0.071, "verdict": "strong" } }
        })))
        .mount(&harness.analysis_agent)
        .await;

    let response = harness
        .post(
            "/v1/ctr/predict",
            &json!({
                "channelId": CHANNEL,
                "prompt": "Rust in 100 seconds",
                "image": "https://cdn.example/thumb.png"
            }),
        )
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["ctrData"]["verdict"], "strong");
    assert_eq!(body["balanceAfter"], 7);
}

#[tokio::test]
async fn ctr_without_output_is_refunded() {
    let harness = TestHarness::new().await;
    harness.seed_user(12).await;

    Mock::given(method("POST"))
        .and(path("/CTR_Predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .mount(&harness.analysis_agent)
        .await;

    harness
        .post(
            "/v1/ctr/predict",
            &json!({
                "channelId": CHANNEL,
                "prompt": "Rust in 100 seconds",
                "image": "https://cdn.example/thumb.png"
            }),
        )
        .await
        .assert_status(StatusCode::BAD_GATEWAY);

    assert_eq!(harness.balance().await, 12);
}
