//! Job record read APIs.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thryve_core::{ChannelId, IdeaId, JobId, JobKind, JobRecord, JobStatus, UserId};
use thryve_store::{JobQuery, Store};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::orchestrator::{owned_channel, parse_channel_id};
use crate::state::AppState;

/// A job record as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    /// Internal id.
    pub id: JobId,
    /// Correlation id issued by the agent or synthesized locally.
    pub generator_id: String,
    /// Record kind.
    pub kind: JobKind,
    /// Owning channel.
    pub channel_id: ChannelId,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Result URL.
    pub url: Option<String>,
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Media type.
    pub asset_type: Option<String>,
    /// Parent reel.
    pub parent_id: Option<JobId>,
    /// Linked idea.
    pub video_idea_id: Option<IdeaId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<&JobRecord> for JobResponse {
    fn from(job: &JobRecord) -> Self {
        Self {
            id: job.id,
            generator_id: job.generator_id.clone(),
            kind: job.kind,
            channel_id: job.channel_id.clone(),
            status: job.status,
            url: job.url.clone(),
            title: job.title.clone(),
            description: job.description.clone(),
            asset_type: job.asset_type.clone(),
            parent_id: job.parent_id,
            video_idea_id: job.video_idea_id,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Acknowledgement of a created job.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreatedResponse {
    /// Always `true`.
    pub success: bool,
    /// Internal id of the record.
    pub id: JobId,
    /// Correlation id.
    pub generator_id: String,
    /// Agent request id, absent for locally completed records.
    pub request_id: Option<String>,
    /// Credits left after the charge, when one was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<i64>,
}

/// Optional channel filter shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelFilter {
    /// Restrict to one owned channel.
    pub channel_id: Option<String>,
}

/// Resolve an optional channel filter, rejecting channels the caller does
/// not own.
pub async fn resolve_channel_filter(
    state: &AppState,
    user_id: &UserId,
    raw: Option<&str>,
) -> Result<Option<ChannelId>, ApiError> {
    match raw.filter(|s| !s.is_empty()) {
        Some(raw) => {
            let channel_id = parse_channel_id(raw)?;
            owned_channel(state, user_id, &channel_id).await?;
            Ok(Some(channel_id))
        }
        None => Ok(None),
    }
}

/// List query for `GET /v1/jobs`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    /// Restrict to one owned channel.
    pub channel_id: Option<String>,
    /// Restrict to one kind.
    pub kind: Option<String>,
    /// Restrict to one status.
    pub status: Option<String>,
    /// Maximum number of records (default 50, max 100).
    pub limit: Option<usize>,
}

/// Job list response.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    /// Matching records, newest first.
    pub jobs: Vec<JobResponse>,
}

/// Get one job owned by the caller.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(job_id): ApiPath<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let job_id: JobId = job_id
        .parse()
        .map_err(|_| ApiError::NotFound("Job not found".into()))?;

    let job = state
        .store
        .get_job(&job_id)
        .await?
        .filter(|job| job.user_id == auth.user_id)
        .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;

    Ok(Json(JobResponse::from(&job)))
}

/// List the caller's jobs.
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListJobsQuery>,
) -> Result<Json<JobListResponse>, ApiError> {
    let channel_id =
        resolve_channel_filter(&state, &auth.user_id, query.channel_id.as_deref()).await?;

    let mut filter = JobQuery::for_user(auth.user_id.clone()).channel(channel_id);

    if let Some(kind) = query.kind.as_deref() {
        let kind: JobKind = kind
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid kind: {kind}")))?;
        filter = filter.kind(kind);
    }

    if let Some(status) = query.status.as_deref() {
        let status: JobStatus = status
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid status: {status}")))?;
        filter = filter.status(Some(status));
    }

    filter.limit = Some(query.limit.unwrap_or(50).min(100));

    let jobs = state.store.list_jobs(&filter).await?;

    Ok(Json(JobListResponse {
        jobs: jobs.iter().map(JobResponse::from).collect(),
    }))
}
