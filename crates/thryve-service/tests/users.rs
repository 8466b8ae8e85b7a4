//! User provisioning integration tests.

mod common;

use axum::http::{header, StatusCode};
use common::TestHarness;
use serde_json::{json, Value};

#[tokio::test]
async fn create_user_grants_signup_credits() {
    let harness = TestHarness::new().await;

    let response = harness
        .post(
            "/v1/users/me",
            &json!({ "name": "Ada", "email": "ada@example.com" }),
        )
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["id"], "user_test");
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["credits"], 50);

    let response = harness.get("/v1/credits/transactions").await;
    let body: Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["transactionType"], "bonus");
    assert_eq!(transactions[0]["amount"], 50);
}

#[tokio::test]
async fn create_user_twice_conflicts() {
    let harness = TestHarness::new().await;

    harness
        .post("/v1/users/me", &json!({}))
        .await
        .assert_status(StatusCode::CREATED);

    let response = harness.post("/v1/users/me", &json!({})).await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "conflict");
    assert_eq!(harness.balance().await, 50);
}

#[tokio::test]
async fn signup_credits_are_configurable() {
    let harness = TestHarness::with_config(|c| c.signup_credits = 0).await;

    let response = harness.post("/v1/users/me", &json!({})).await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["credits"], 0);
}

#[tokio::test]
async fn get_user_not_found() {
    let harness = TestHarness::new().await;

    let response = harness.get("/v1/users/me").await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn get_user_without_auth_fails() {
    let harness = TestHarness::new().await;

    harness.server.get("/v1/users/me").await.assert_status_unauthorized();

    harness
        .server
        .get("/v1/users/me")
        .add_header(
            header::AUTHORIZATION,
            header::HeaderValue::from_static("Bearer not-a-jwt"),
        )
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn provider_signed_token_authenticates() {
    let keys = wiremock::MockServer::start().await;
    let jwks: Value = serde_json::from_str(include_str!("fixtures/jwks.json")).unwrap();
    wiremock::Mock::given(wiremock::matchers::path("/jwks"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(jwks))
        .mount(&keys)
        .await;

    let jwks_url = format!("{}/jwks", keys.uri());
    let harness = TestHarness::with_config(|c| {
        c.auth_issuer = Some("https://issuer.test".into());
        c.auth_jwks_url = Some(jwks_url);
    })
    .await;
    harness.seed_user(9).await;

    let now = chrono::Utc::now().timestamp();
    let sign = |iss: &str| {
        let mut token_header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        token_header.kid = Some("k1".into());
        let key =
            jsonwebtoken::EncodingKey::from_rsa_pem(include_bytes!("fixtures/rsa_k1.pem")).unwrap();
        let claims = json!({ "sub": "user_test", "iss": iss, "aud": "thryve", "exp": now + 600 });
        let token = jsonwebtoken::encode(&token_header, &claims, &key).unwrap();
        header::HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
    };

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header(header::AUTHORIZATION, sign("https://issuer.test"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["credits"], 9);

    harness
        .server
        .get("/v1/credits/balance")
        .add_header(header::AUTHORIZATION, sign("https://other.test"))
        .await
        .assert_status_unauthorized();
}
