//! Credit pack purchases through Stripe.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use thryve_core::{CreditPack, TransactionType, UserId, CREDIT_PACKS};
use thryve_store::CreditGrant;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;
use crate::stripe::{PaymentIntent, StripeClient, StripeError};

/// Available packs.
#[derive(Debug, Serialize)]
pub struct PacksResponse {
    /// Packs on sale.
    pub packs: Vec<CreditPack>,
}

/// List the credit packs on sale.
pub async fn list_packs() -> Json<PacksResponse> {
    Json(PacksResponse {
        packs: CREDIT_PACKS.to_vec(),
    })
}

/// Payment intent request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    /// Pack to buy.
    pub pack_id: String,
}

/// Payment intent response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    /// Secret for the client-side payment form.
    pub client_secret: String,
    /// Stripe payment intent id.
    pub payment_intent_id: String,
    /// Credits granted once paid.
    pub credits: i64,
    /// Price charged.
    pub amount_cents: i64,
}

/// Start a credit pack purchase.
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreatePaymentIntentRequest>,
) -> Result<Json<CreatePaymentIntentResponse>, ApiError> {
    let stripe = stripe_client(&state)?;

    let pack = CreditPack::find(&body.pack_id)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown packId: {}", body.pack_id)))?;

    let intent = stripe
        .create_payment_intent(&auth.user_id, &pack)
        .await
        .map_err(stripe_failure)?;

    let client_secret = intent.client_secret.ok_or_else(|| {
        ApiError::ExternalService("Payment intent has no client secret".into())
    })?;

    tracing::info!(
        user_id = %auth.user_id,
        pack_id = %pack.id,
        payment_intent_id = %intent.id,
        "Payment intent created"
    );

    Ok(Json(CreatePaymentIntentResponse {
        client_secret,
        payment_intent_id: intent.id,
        credits: pack.credits,
        amount_cents: pack.price_cents,
    }))
}

/// Credit request after a client-confirmed payment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPaymentRequest {
    /// Stripe payment intent id.
    pub payment_intent_id: String,
}

/// Credit response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPaymentResponse {
    /// Whether this call changed the balance.
    pub credited: bool,
    /// Credits in the purchased pack.
    pub credits: i64,
    /// Balance after the grant, when applied.
    pub balance: Option<i64>,
}

/// Credit a succeeded payment to the caller.
///
/// Safe to call repeatedly; the payment intent id is the grant reference.
pub async fn credit_payment_intent(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreditPaymentRequest>,
) -> Result<Json<CreditPaymentResponse>, ApiError> {
    let stripe = stripe_client(&state)?;

    let intent = stripe
        .get_payment_intent(&body.payment_intent_id)
        .await
        .map_err(stripe_failure)?;

    if !intent.is_succeeded() {
        return Err(ApiError::BadRequest(format!(
            "Payment not completed (status: {})",
            intent.status
        )));
    }

    if intent.metadata_str("user_id") != Some(auth.user_id.as_str()) {
        return Err(ApiError::NotFound("Payment not found".into()));
    }

    let (credits, applied) = credit_payment(&state, &auth.user_id, &intent).await?;

    Ok(Json(CreditPaymentResponse {
        credited: applied.is_some(),
        credits,
        balance: applied,
    }))
}

/// Grant the credits of a succeeded payment intent to `user_id`.
///
/// Returns the pack credits and, when the grant was applied by this call, the
/// new balance.
pub(crate) async fn credit_payment(
    state: &AppState,
    user_id: &UserId,
    intent: &PaymentIntent,
) -> Result<(i64, Option<i64>), ApiError> {
    let credits = intent
        .metadata_str("credits")
        .and_then(|c| c.parse::<i64>().ok())
        .filter(|c| *c > 0)
        .or_else(|| {
            intent
                .metadata_str("pack_id")
                .and_then(CreditPack::find)
                .map(|p| p.credits)
        })
        .ok_or_else(|| ApiError::BadRequest("Payment carries no credit pack".into()))?;

    let grant = CreditGrant {
        user_id: user_id.clone(),
        amount: credits,
        transaction_type: TransactionType::Purchase,
        operation: None,
        reference: Some(intent.id.clone()),
        description: format!("Purchased {credits} credits"),
    };

    let applied = state.ledger.grant(&grant).await?;

    tracing::info!(
        user_id = %user_id,
        payment_intent_id = %intent.id,
        credits,
        applied = applied.is_some(),
        "Payment credited"
    );

    Ok((credits, applied.map(|tx| tx.balance_after)))
}

fn stripe_client(state: &AppState) -> Result<&StripeClient, ApiError> {
    state
        .stripe
        .as_deref()
        .ok_or_else(|| ApiError::NotConfigured("Stripe is not configured".into()))
}

fn stripe_failure(err: StripeError) -> ApiError {
    match err {
        StripeError::Api {
            error_type,
            message,
            ..
        } if error_type == "invalid_request_error" => {
            ApiError::BadRequest(format!("Payment provider rejected request: {message}"))
        }
        StripeError::Configuration(msg) => ApiError::NotConfigured(msg),
        other => {
            tracing::error!(error = %other, "Stripe request failed");
            ApiError::ExternalService("Payment provider unavailable".into())
        }
    }
}
