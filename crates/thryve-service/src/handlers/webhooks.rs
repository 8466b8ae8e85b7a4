//! Webhook handlers for agent completions and Stripe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use thryve_core::{JobStatus, UserId};
use thryve_store::{JobCompletion, Store};

use crate::crypto::verify_hex_signature;
use crate::error::ApiError;
use crate::handlers::billing::credit_payment;
use crate::state::AppState;
use crate::stripe::{PaymentIntent, WebhookEvent};

/// Header carrying the hex HMAC-SHA256 of an agent callback body.
pub const AGENT_SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Completion callback sent by an agent.
///
/// Fields are read leniently from the raw JSON so an oddly typed field
/// never blocks the correlation lookup.
#[derive(Debug, Default)]
pub struct AgentCallback {
    body: Value,
}

/// Media lists searched for a result URL, in order.
const RESULT_MEDIA: [&str; 3] = ["images", "video", "audio"];

impl AgentCallback {
    /// Parse a raw callback body.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: serde_json::from_str(raw)?,
        })
    }

    /// `request_id`, else `gateway_request_id`. Numeric ids are accepted.
    #[must_use]
    pub fn correlation_id(&self) -> Option<String> {
        id_field(self.body.get("request_id"))
            .or_else(|| id_field(self.body.get("gateway_request_id")))
    }

    /// Reported status; non-string values count as absent.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.body.get("status").and_then(Value::as_str)
    }

    /// First of the image, video and audio result URLs.
    #[must_use]
    pub fn result_url(&self) -> Option<&str> {
        RESULT_MEDIA.iter().find_map(|media| {
            self.body
                .pointer(&format!("/payload/{media}/0/url"))
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
        })
    }
}

fn id_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Agent callback acknowledgement.
#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    /// Always `true`.
    pub success: bool,
}

/// Apply an agent's completion callback to its job record.
pub async fn agent_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<CallbackResponse>, ApiError> {
    if let Some(secret) = &state.config.agent_webhook_secret {
        let signature = headers
            .get(AGENT_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        if !verify_hex_signature(secret, body.as_bytes(), signature) {
            tracing::warn!("Invalid agent webhook signature");
            return Err(ApiError::Unauthorized);
        }
    }

    let callback = AgentCallback::parse(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid callback body: {e}")))?;

    let generator_id = callback
        .correlation_id()
        .ok_or_else(|| ApiError::BadRequest("request_id is required".into()))?;
    let url = callback.result_url();
    let status = JobStatus::from_callback(callback.status());

    match state.store.complete_job(&generator_id, status, url).await? {
        JobCompletion::Applied(job) => {
            tracing::info!(
                generator_id = %generator_id,
                job_id = %job.id,
                kind = %job.kind.as_str(),
                status = %status.as_str(),
                has_url = url.is_some(),
                "Job completed"
            );
        }
        JobCompletion::AlreadyTerminal(job) => {
            if job.matches_completion(status, url) {
                tracing::debug!(generator_id = %generator_id, "Duplicate completion ignored");
            } else {
                tracing::warn!(
                    generator_id = %generator_id,
                    job_id = %job.id,
                    stored_status = %job.status.as_str(),
                    received_status = %status.as_str(),
                    stored_url = ?job.url,
                    received_url = ?url,
                    "Redelivered completion disagrees with stored job"
                );
            }
        }
        JobCompletion::NotFound => {
            tracing::warn!(generator_id = %generator_id, "Completion for unknown job");
            return Err(ApiError::NotFound(
                "No matching record found for request_id".into(),
            ));
        }
    }

    Ok(Json(CallbackResponse { success: true }))
}

/// Stripe webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
}

/// Handle Stripe webhooks.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    if state.config.stripe_webhook_secret.is_some() {
        let sig = signature.ok_or_else(|| ApiError::BadRequest("Missing Stripe signature".into()))?;

        let stripe = state
            .stripe
            .as_ref()
            .ok_or_else(|| ApiError::NotConfigured("Stripe is not configured".into()))?;

        stripe.verify_webhook_signature(&body, sig).map_err(|e| {
            tracing::warn!(error = %e, "Invalid Stripe webhook signature");
            ApiError::BadRequest("Invalid webhook signature".into())
        })?;
    } else {
        tracing::warn!("Stripe webhook secret not configured - skipping signature verification");
    }

    let event: WebhookEvent =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %event.event_type,
        event_id = %event.id,
        "Received Stripe webhook"
    );

    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let intent: PaymentIntent = serde_json::from_value(event.data.object)
                .map_err(|e| ApiError::BadRequest(format!("Invalid payment intent: {e}")))?;
            handle_payment_succeeded(&state, &intent).await?;
        }
        "payment_intent.payment_failed" => {
            let id = event
                .data
                .object
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            tracing::warn!(payment_intent_id = %id, "Payment failed");
        }
        _ => {
            tracing::debug!(event_type = %event.event_type, "Unhandled Stripe event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

async fn handle_payment_succeeded(state: &AppState, intent: &PaymentIntent) -> Result<(), ApiError> {
    let Some(user_id) = intent
        .metadata_str("user_id")
        .and_then(|id| UserId::new(id).ok())
    else {
        tracing::warn!(
            payment_intent_id = %intent.id,
            "Payment intent carries no user, ignoring"
        );
        return Ok(());
    };

    credit_payment(state, &user_id, intent).await?;
    Ok(())
}
