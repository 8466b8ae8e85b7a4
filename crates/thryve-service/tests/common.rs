//! Common test utilities for thryve integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use thryve_core::{Channel, ChannelId, User, UserId};
use thryve_service::{create_router, AppState, ServiceConfig};
use thryve_store::{MemoryStore, Store};

/// Admin key accepted by the test service.
pub const ADMIN_KEY: &str = "test-admin-key";

/// Channel registered by [`TestHarness::seed_user`].
pub const CHANNEL: &str = "UC_test_channel";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle on the backing store.
    pub store: Arc<MemoryStore>,
    /// Mock content agent (voice, thumbnail, reel, plan, SEO).
    pub content_agent: MockServer,
    /// Mock analysis agent (discovery, CTR).
    pub analysis_agent: MockServer,
    /// Mock Stripe API.
    pub stripe: MockServer,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a harness with agents and Stripe pointed at mock servers.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a harness, adjusting the configuration before the service
    /// starts.
    pub async fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let content_agent = MockServer::start().await;
        let analysis_agent = MockServer::start().await;
        let stripe = MockServer::start().await;

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            auth_base_url: "http://localhost".into(),
            admin_api_key: Some(ADMIN_KEY.into()),
            content_agent_url: Some(content_agent.uri()),
            analysis_agent_url: Some(analysis_agent.uri()),
            agent_callback_url: "http://localhost/webhooks/agent".into(),
            agent_timeout_seconds: 5,
            stripe_api_key: Some("sk_test_123".into()),
            stripe_api_base: Some(stripe.uri()),
            request_timeout_seconds: 30,
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();

        let state = AppState::new(dyn_store, config).expect("Failed to build state");
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            content_agent,
            analysis_agent,
            stripe,
            test_user_id: UserId::new("user_test").unwrap(),
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> HeaderValue {
        bearer(&self.test_user_id)
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> HeaderValue {
        bearer(&UserId::new("user_other").unwrap())
    }

    /// Insert the test user with a balance and one owned channel.
    pub async fn seed_user(&self, credits: i64) {
        self.store
            .create_user(&User::new(self.test_user_id.clone(), credits))
            .await
            .unwrap();
        self.store
            .insert_channel(&Channel::new(
                ChannelId::new(CHANNEL).unwrap(),
                self.test_user_id.clone(),
                "Test Channel",
            ))
            .await
            .unwrap();
    }

    /// Current balance of the test user.
    pub async fn balance(&self) -> i64 {
        self.store
            .get_user(&self.test_user_id)
            .await
            .unwrap()
            .expect("test user exists")
            .credits
    }

    /// Authenticated GET.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.server
            .get(uri)
            .add_header(header::AUTHORIZATION, self.user_auth_header())
            .await
    }

    /// Authenticated JSON POST.
    pub async fn post(&self, uri: &str, body: &Value) -> TestResponse {
        self.server
            .post(uri)
            .add_header(header::AUTHORIZATION, self.user_auth_header())
            .json(body)
            .await
    }

    /// Deliver an agent completion callback.
    pub async fn callback(&self, body: &Value) -> TestResponse {
        self.server.post("/webhooks/agent").json(body).await
    }

    /// Make the content agent accept `feature_path` with `request_id`.
    pub async fn accept_job(&self, feature_path: &str, request_id: &str) {
        Mock::given(method("POST"))
            .and(path(feature_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(accepted(request_id)))
            .mount(&self.content_agent)
            .await;
    }
}

/// Bearer header for the test-token bypass.
pub fn bearer(user_id: &UserId) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer test-token:{user_id}")).unwrap()
}

/// Admin key header name.
pub fn admin_header() -> HeaderName {
    HeaderName::from_static("x-admin-key")
}

/// Agent body for an accepted asynchronous job.
pub fn accepted(request_id: &str) -> Value {
    json!({ "result": { "Response": { "request_id": request_id } } })
}
