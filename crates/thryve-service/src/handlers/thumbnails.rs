//! Thumbnail generation.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use thryve_core::{JobKind, JobRecord, JobStatus, Operation};
use thryve_store::{JobQuery, Store};

use crate::agent::{AgentFeature, ThumbnailPayload};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::handlers::jobs::{
    resolve_channel_filter, ChannelFilter, JobCreatedResponse, JobListResponse, JobResponse,
};
use crate::orchestrator::{owned_channel, parse_channel_id, submit_job, JobSubmission};
use crate::state::AppState;

/// Thumbnail request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateThumbnailRequest {
    /// Target channel.
    pub channel_id: String,
    /// Source images; at most three are sent.
    #[serde(default)]
    pub images: Vec<String>,
    /// Extra direction placed before the style prompt.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Optional title.
    #[serde(default)]
    pub title: Option<String>,
}

/// Start a thumbnail job.
pub async fn generate_thumbnail(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<GenerateThumbnailRequest>,
) -> Result<Json<JobCreatedResponse>, ApiError> {
    let channel_id = parse_channel_id(&body.channel_id)?;

    let images: Vec<String> = body
        .images
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();
    if images.is_empty() {
        return Err(ApiError::BadRequest("At least one image is required".into()));
    }

    owned_channel(&state, &auth.user_id, &channel_id).await?;

    let payload = ThumbnailPayload::new(&images, body.prompt.as_deref(), state.agents.callback_url());

    let record = JobRecord::processing(JobKind::Thumbnail, "", auth.user_id.clone(), channel_id)
        .with_details(body.title, body.prompt.clone());

    let submitted = submit_job(
        &state,
        JobSubmission {
            user_id: auth.user_id,
            operation: Operation::ThumbnailGenerate,
            feature: AgentFeature::ThumbnailMake,
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

/// List the caller's finished thumbnails.
pub async fn list_thumbnails(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(filter): ApiQuery<ChannelFilter>,
) -> Result<Json<JobListResponse>, ApiError> {
    let channel_id =
        resolve_channel_filter(&state, &auth.user_id, filter.channel_id.as_deref()).await?;

    let query = JobQuery::for_user(auth.user_id)
        .channel(channel_id)
        .kind(JobKind::Thumbnail)
        .status(Some(JobStatus::Completed));

    let jobs = state.store.list_jobs(&query).await?;

    Ok(Json(JobListResponse {
        jobs: jobs.iter().map(JobResponse::from).collect(),
    }))
}
