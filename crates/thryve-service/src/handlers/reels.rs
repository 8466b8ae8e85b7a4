//! Reel generation and listing.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use thryve_core::{media_asset_type, IdeaId, JobId, JobKind, JobRecord, Operation, UserId};
use thryve_store::{JobQuery, Store};

use crate::agent::{AgentFeature, ReelPayload};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::handlers::jobs::{resolve_channel_filter, ChannelFilter, JobCreatedResponse, JobResponse};
use crate::orchestrator::{owned_channel, parse_channel_id, submit_job, JobSubmission};
use crate::state::AppState;

/// Reel request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReelRequest {
    /// Target channel.
    pub channel_id: String,
    /// Reel title.
    pub title: String,
    /// Reel description.
    #[serde(default)]
    pub description: Option<String>,
    /// Idea the reel realizes.
    #[serde(default)]
    pub video_idea_id: Option<String>,
    /// Creative direction; with media, starts an agent job.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Media to build the reel from.
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Create a reel.
///
/// With a prompt and media the reel is generated by the content agent and
/// charged. Otherwise it is recorded as complete without a charge. Media URLs
/// are stored as child records in both cases.
pub async fn create_reel(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateReelRequest>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError> {
    let channel_id = parse_channel_id(&body.channel_id)?;

    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }

    owned_channel(&state, &auth.user_id, &channel_id).await?;

    let video_idea_id = match body.video_idea_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(owned_idea(&state, &auth.user_id, raw).await?),
        None => None,
    };

    let media: Vec<String> = body
        .image_urls
        .into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();

    let prompt = body
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let user_id = auth.user_id;
    let details = (Some(body.title), body.description);

    match prompt {
        Some(prompt) if !media.is_empty() => {
            let payload = ReelPayload {
                prompt,
                image_urls: &media,
                fal_webhook: state.agents.callback_url(),
            };

            let record = JobRecord::processing(JobKind::Reel, "", user_id.clone(), channel_id)
                .with_details(details.0, details.1)
                .with_video_idea(video_idea_id);

            let submitted = submit_job(
                &state,
                JobSubmission {
                    user_id,
                    operation: Operation::ReelGenerate,
                    feature: AgentFeature::ReelsMaking,
                    payload,
                    record,
                },
                |reel| media_children(reel, &media),
            )
            .await?;

            Ok((
                StatusCode::CREATED,
                Json(JobCreatedResponse {
                    success: true,
                    id: submitted.job.id,
                    request_id: Some(submitted.job.generator_id.clone()),
                    generator_id: submitted.job.generator_id,
                    balance_after: Some(submitted.debit.balance_after),
                }),
            ))
        }
        _ => {
            let reel = JobRecord::completed_locally(JobKind::Reel, user_id.clone(), channel_id, None)
                .with_details(details.0, details.1)
                .with_video_idea(video_idea_id);

            let mut batch = vec![reel.clone()];
            batch.extend(media_children(&reel, &media));
            state.store.insert_jobs(&batch).await?;

            tracing::info!(
                user_id = %user_id,
                job_id = %reel.id,
                generator_id = %reel.generator_id,
                media = media.len(),
                "Reel recorded"
            );

            Ok((
                StatusCode::CREATED,
                Json(JobCreatedResponse {
                    success: true,
                    id: reel.id,
                    generator_id: reel.generator_id,
                    request_id: None,
                    balance_after: None,
                }),
            ))
        }
    }
}

/// One completed child record per media URL.
fn media_children(reel: &JobRecord, media: &[String]) -> Vec<JobRecord> {
    media
        .iter()
        .map(|url| {
            JobRecord::completed_locally(
                JobKind::ReelAsset,
                reel.user_id.clone(),
                reel.channel_id.clone(),
                Some(url.clone()),
            )
            .with_asset_type(media_asset_type(url))
            .with_parent(reel.id)
        })
        .collect()
}

async fn owned_idea(state: &AppState, user_id: &UserId, raw: &str) -> Result<IdeaId, ApiError> {
    let not_found = || ApiError::NotFound("Video idea not found".into());
    let idea_id: IdeaId = raw.parse().map_err(|_| not_found())?;
    state
        .store
        .get_idea(&idea_id)
        .await?
        .filter(|idea| &idea.user_id == user_id)
        .map(|idea| idea.id)
        .ok_or_else(not_found)
}

/// A reel with its media.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReelResponse {
    /// The reel record.
    #[serde(flatten)]
    pub reel: JobResponse,
    /// Media records, oldest first.
    pub reel_assets: Vec<JobResponse>,
}

/// Reel list response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReelListResponse {
    /// Reels, newest first.
    pub reels: Vec<ReelResponse>,
    /// Number of reels returned.
    pub total_reels: usize,
}

/// List the caller's reels with their media.
pub async fn list_reels(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(filter): ApiQuery<ChannelFilter>,
) -> Result<Json<ReelListResponse>, ApiError> {
    let channel_id =
        resolve_channel_filter(&state, &auth.user_id, filter.channel_id.as_deref()).await?;

    let reels = state
        .store
        .list_jobs(
            &JobQuery::for_user(auth.user_id.clone())
                .channel(channel_id.clone())
                .kind(JobKind::Reel),
        )
        .await?;

    let assets = state
        .store
        .list_jobs(
            &JobQuery::for_user(auth.user_id)
                .channel(channel_id)
                .kind(JobKind::ReelAsset)
                .oldest_first(),
        )
        .await?;

    let mut by_parent: HashMap<JobId, Vec<JobResponse>> = HashMap::new();
    for asset in &assets {
        if let Some(parent) = asset.parent_id {
            by_parent
                .entry(parent)
                .or_default()
                .push(JobResponse::from(asset));
        }
    }

    let reels: Vec<ReelResponse> = reels
        .iter()
        .map(|reel| ReelResponse {
            reel: JobResponse::from(reel),
            reel_assets: by_parent.remove(&reel.id).unwrap_or_default(),
        })
        .collect();

    Ok(Json(ReelListResponse {
        total_reels: reels.len(),
        reels,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use thryve_core::{ChannelId, JobStatus};

    #[test]
    fn children_are_typed_by_extension() {
        let reel = JobRecord::processing(
            JobKind::Reel,
            "r1",
            UserId::new("alice").unwrap(),
            ChannelId::new("UC1").unwrap(),
        );
        let media = vec![
            "https://cdn.example/a.MP4".to_string(),
            "https://cdn.example/b.png".to_string(),
        ];

        let children = media_children(&reel, &media);

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].asset_type.as_deref(), Some("mp4"));
        assert_eq!(children[1].asset_type.as_deref(), Some("image"));
        for child in &children {
            assert_eq!(child.kind, JobKind::ReelAsset);
            assert_eq!(child.status, JobStatus::Completed);
            assert_eq!(child.parent_id, Some(reel.id));
            assert!(child.generator_id.starts_with("reel_asset_"));
        }
    }
}
