//! Click-through-rate prediction.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use thryve_core::Operation;

use crate::agent::{types, AgentFeature, CtrPayload};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::orchestrator::{call_metered, owned_channel, parse_channel_id};
use crate::state::AppState;

/// Prediction request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictCtrRequest {
    /// Channel the video belongs to.
    pub channel_id: String,
    /// Title or concept.
    pub prompt: String,
    /// Thumbnail image URL.
    pub image: String,
}

/// Prediction response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictCtrResponse {
    /// Always `true`.
    pub success: bool,
    /// Agent output.
    pub ctr_data: Value,
    /// Credits left.
    pub balance_after: i64,
}

/// Predict how well a title and thumbnail will perform.
pub async fn predict_ctr(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<PredictCtrRequest>,
) -> Result<Json<PredictCtrResponse>, ApiError> {
    let channel_id = parse_channel_id(&body.channel_id)?;

    if body.prompt.trim().is_empty() || body.image.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt and image are required".into()));
    }

    owned_channel(&state, &auth.user_id, &channel_id).await?;

    let payload = CtrPayload {
        prompt: body.prompt.trim(),
        image: body.image.trim(),
    };

    let (reply, debit) = call_metered(
        &state,
        &auth.user_id,
        Operation::CtrPredict,
        AgentFeature::CtrPredict,
        &payload,
        Some(types::OUTPUT),
    )
    .await?;

    tracing::info!(user_id = %auth.user_id, channel_id = %channel_id, "CTR predicted");

    Ok(Json(PredictCtrResponse {
        success: true,
        ctr_data: reply.at(types::OUTPUT).cloned().unwrap_or(Value::Null),
        balance_after: debit.balance_after,
    }))
}
