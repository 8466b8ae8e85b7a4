//! Voice-over generation and uploaded assets.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use thryve_core::{JobKind, JobRecord, Operation, AUDIO_ASSET_TYPE};
use thryve_store::{JobQuery, Store};

use crate::agent::{AgentFeature, VoicePayload};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::handlers::jobs::{
    resolve_channel_filter, ChannelFilter, JobCreatedResponse, JobListResponse, JobResponse,
};
use crate::orchestrator::{owned_channel, parse_channel_id, submit_job, JobSubmission};
use crate::state::AppState;

/// Voice-over request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAudioRequest {
    /// Target channel.
    pub channel_id: String,
    /// Text to speak.
    pub text: String,
    /// Reference voice sample.
    pub ref_audio_url: String,
    /// Optional title.
    #[serde(default)]
    pub title: Option<String>,
}

/// Start a voice-over job.
pub async fn generate_audio(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<GenerateAudioRequest>,
) -> Result<Json<JobCreatedResponse>, ApiError> {
    let channel_id = parse_channel_id(&body.channel_id)?;

    if body.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".into()));
    }
    if body.ref_audio_url.trim().is_empty() {
        return Err(ApiError::BadRequest("refAudioUrl is required".into()));
    }

    owned_channel(&state, &auth.user_id, &channel_id).await?;

    let payload = VoicePayload {
        text: &body.text,
        ref_audio_url: &body.ref_audio_url,
        fal_webhook: state.agents.callback_url(),
    };

    let record = JobRecord::processing(JobKind::Asset, "", auth.user_id.clone(), channel_id)
        .with_details(body.title, None)
        .with_asset_type(AUDIO_ASSET_TYPE);

    let submitted = submit_job(
        &state,
        JobSubmission {
            user_id: auth.user_id,
            operation: Operation::AudioGenerate,
            feature: AgentFeature::VoiceFromText,
            payload,
            record,
        },
        |_| Vec::new(),
    )
    .await?;

    Ok(Json(JobCreatedResponse {
        success: true,
        id: submitted.job.id,
        request_id: Some(submitted.job.generator_id.clone()),
        generator_id: submitted.job.generator_id,
        balance_after: Some(submitted.debit.balance_after),
    }))
}

/// Uploaded asset registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    /// Target channel.
    pub channel_id: String,
    /// Where the file lives.
    pub url: String,
    /// Media type, e.g. `mp3` or `mp4`.
    pub asset_type: String,
    /// Optional title.
    #[serde(default)]
    pub title: Option<String>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Record an asset the caller uploaded elsewhere.
pub async fn create_asset(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateAssetRequest>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
    let channel_id = parse_channel_id(&body.channel_id)?;

    if body.url.trim().is_empty() {
        return Err(ApiError::BadRequest("url is required".into()));
    }
    if body.asset_type.trim().is_empty() {
        return Err(ApiError::BadRequest("assetType is required".into()));
    }

    owned_channel(&state, &auth.user_id, &channel_id).await?;

    let record =
        JobRecord::completed_locally(JobKind::Asset, auth.user_id.clone(), channel_id, Some(body.url))
            .with_details(body.title, body.description)
            .with_asset_type(body.asset_type.trim());

    state.store.insert_job(&record).await?;

    tracing::info!(
        user_id = %auth.user_id,
        job_id = %record.id,
        generator_id = %record.generator_id,
        "Asset recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(JobCreatedResponse {
            success: true,
            id: record.id,
            generator_id: record.generator_id,
            request_id: None,
            balance_after: None,
        }),
    ))
}

/// List the caller's voice-overs.
pub async fn list_audio(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(filter): ApiQuery<ChannelFilter>,
) -> Result<Json<JobListResponse>, ApiError> {
    let channel_id =
        resolve_channel_filter(&state, &auth.user_id, filter.channel_id.as_deref()).await?;

    let query = JobQuery::for_user(auth.user_id)
        .channel(channel_id)
        .kind(JobKind::Asset)
        .asset_type(AUDIO_ASSET_TYPE);

    let jobs = state.store.list_jobs(&query).await?;

    Ok(Json(JobListResponse {
        jobs: jobs.iter().map(JobResponse::from).collect(),
    }))
}
