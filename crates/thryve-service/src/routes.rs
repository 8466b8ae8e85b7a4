//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    assets, billing, channels, credits, critique, ctr, discovery, health, ideas, jobs, reels,
    thumbnails, users, webhooks,
};
use crate::state::AppState;

/// Maximum concurrent requests across the general `/v1` endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Maximum concurrent requests across the endpoints that call an agent.
/// Each one may hold a connection for the full agent timeout.
const AGENT_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Users, channels, ideas (bearer token)
/// - `POST /v1/users/me`, `GET /v1/users/me`
/// - `POST /v1/channels`, `GET /v1/channels`, `GET /v1/channels/:channel_id`
/// - `GET /v1/channels/similar?ownerChannelId=`
/// - `POST /v1/ideas`, `GET /v1/ideas?channelId=`
///
/// ## Credits and billing (bearer token, admin key for `/credits/add`)
/// - `GET /v1/credits/balance`, `GET /v1/credits/transactions`, `GET /v1/credits/costs`
/// - `POST /v1/credits/add`
/// - `GET /v1/billing/packs`, `POST /v1/billing/payment-intent`, `POST /v1/billing/credit`
///
/// ## Agent features (bearer token, charged unless noted)
/// - `POST /v1/audio/generate`, `POST /v1/thumbnails`, `POST /v1/reels`
/// - `POST /v1/channels/similar/discover`
/// - `POST /v1/ideas/generate-plan`, `POST /v1/ideas/generate-seo`
/// - `POST /v1/ctr/predict`
/// - `POST /v1/videos/comments/critique` (free)
///
/// ## Job records (bearer token)
/// - `GET /v1/jobs`, `GET /v1/jobs/:job_id`
/// - `POST /v1/assets`, `GET /v1/assets/audio`, `GET /v1/thumbnails`, `GET /v1/reels`
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/agent` (also `/api/webhook`) - Agent completions
/// - `POST /webhooks/stripe` - Stripe webhooks
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // `Router::layer` wraps each route separately; the global layer shares
    // one semaphore between them. Agent routes get their own, tighter pool.
    let agent_routes = Router::new()
        .route("/audio/generate", post(assets::generate_audio))
        .route(
            "/thumbnails",
            get(thumbnails::list_thumbnails).post(thumbnails::generate_thumbnail),
        )
        .route("/reels", get(reels::list_reels).post(reels::create_reel))
        .route(
            "/channels/similar/discover",
            post(discovery::discover_similar_channels),
        )
        .route("/ideas/generate-plan", post(ideas::generate_plan))
        .route("/ideas/generate-seo", post(ideas::generate_seo))
        .route("/ctr/predict", post(ctr::predict_ctr))
        .route(
            "/videos/comments/critique",
            post(critique::critique_comments),
        )
        .layer(GlobalConcurrencyLimitLayer::new(AGENT_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Users
        .route("/users/me", get(users::get_user).post(users::create_user))
        // Channels
        .route(
            "/channels",
            get(channels::list_channels).post(channels::create_channel),
        )
        .route("/channels/similar", get(channels::list_similar_channels))
        .route("/channels/:channel_id", get(channels::get_channel))
        // Ideas
        .route("/ideas", get(ideas::list_ideas).post(ideas::create_idea))
        // Credits
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/transactions", get(credits::list_transactions))
        .route("/credits/costs", get(credits::list_costs))
        .route("/credits/add", post(credits::admin_add_credits))
        // Billing
        .route("/billing/packs", get(billing::list_packs))
        .route("/billing/payment-intent", post(billing::create_payment_intent))
        .route("/billing/credit", post(billing::credit_payment_intent))
        // Job records
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/:job_id", get(jobs::get_job))
        .route("/assets", post(assets::create_asset))
        .route("/assets/audio", get(assets::list_audio))
        .layer(GlobalConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        .merge(agent_routes);

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by external services)
        .route("/webhooks/agent", post(webhooks::agent_webhook))
        .route("/api/webhook", post(webhooks::agent_webhook))
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn concurrency_limit_is_shared_across_routes() {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }),
            )
            .route("/fast", get(|| async {}))
            .layer(GlobalConcurrencyLimitLayer::new(1));

        let slow = tokio::spawn(router.clone().oneshot(request("/slow")));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(200), router.clone().oneshot(request("/fast")))
                .await;
        assert!(blocked.is_err(), "second route ran past the shared limit");

        assert_eq!(slow.await.unwrap().unwrap().status(), StatusCode::OK);
        let fast = router.oneshot(request("/fast")).await.unwrap();
        assert_eq!(fast.status(), StatusCode::OK);
    }

    #[test]
    fn cors_accepts_wildcard_and_lists() {
        let _ = build_cors_layer(&["*".to_string()]);
        let _ = build_cors_layer(&[
            "https://app.thryve.app".to_string(),
            "not a header value\n".to_string(),
        ]);
    }
}
