//! Channel registration and competitor listing.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thryve_core::{Channel, ChannelId, SimilarChannel};
use thryve_store::{Store, StoreError};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::orchestrator::{owned_channel, parse_channel_id};
use crate::state::AppState;

/// Channel registration request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelRequest {
    /// YouTube channel id.
    pub channel_id: String,
    /// Channel title.
    pub title: String,
    /// Channel description.
    #[serde(default)]
    pub description: Option<String>,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Cached statistics.
    #[serde(default)]
    pub subscriber_count: Option<i64>,
    /// Cached statistics.
    #[serde(default)]
    pub video_count: Option<i64>,
    /// Cached statistics.
    #[serde(default)]
    pub view_count: Option<i64>,
}

/// A channel as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ChannelResponse {
    pub channel_id: ChannelId,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub subscriber_count: i64,
    pub video_count: i64,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Channel> for ChannelResponse {
    fn from(channel: Channel) -> Self {
        Self {
            channel_id: channel.channel_id,
            title: channel.title,
            description: channel.description,
            thumbnail_url: channel.thumbnail_url,
            subscriber_count: channel.subscriber_count,
            video_count: channel.video_count,
            view_count: channel.view_count,
            created_at: channel.created_at,
        }
    }
}

/// Channel list response.
#[derive(Debug, Serialize)]
pub struct ChannelListResponse {
    /// Channels, oldest first.
    pub channels: Vec<ChannelResponse>,
}

/// Register one of the caller's channels.
pub async fn create_channel(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateChannelRequest>,
) -> Result<(StatusCode, Json<ChannelResponse>), ApiError> {
    let channel_id = parse_channel_id(&body.channel_id)?;

    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }

    state
        .store
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let mut channel = Channel::new(channel_id, auth.user_id.clone(), body.title);
    channel.description = body.description;
    channel.thumbnail_url = body.thumbnail_url;
    channel.subscriber_count = body.subscriber_count.unwrap_or(0).max(0);
    channel.video_count = body.video_count.unwrap_or(0).max(0);
    channel.view_count = body.view_count.unwrap_or(0).max(0);

    match state.store.insert_channel(&channel).await {
        Ok(()) => {}
        Err(StoreError::Conflict { .. }) => {
            return Err(ApiError::Conflict("Channel already registered".into()));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        user_id = %auth.user_id,
        channel_id = %channel.channel_id,
        "Channel registered"
    );

    Ok((StatusCode::CREATED, Json(ChannelResponse::from(channel))))
}

/// List the caller's channels.
pub async fn list_channels(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ChannelListResponse>, ApiError> {
    let channels = state.store.list_channels(&auth.user_id).await?;

    Ok(Json(ChannelListResponse {
        channels: channels.into_iter().map(ChannelResponse::from).collect(),
    }))
}

/// Get one of the caller's channels.
pub async fn get_channel(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(channel_id): ApiPath<String>,
) -> Result<Json<ChannelResponse>, ApiError> {
    let channel_id =
        ChannelId::new(channel_id).map_err(|_| ApiError::NotFound("Channel not found".into()))?;
    let channel = owned_channel(&state, &auth.user_id, &channel_id).await?;

    Ok(Json(ChannelResponse::from(channel)))
}

/// Query for the competitor list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarChannelsQuery {
    /// The caller's channel.
    pub owner_channel_id: String,
}

/// A competitor association as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SimilarChannelResponse {
    pub similar_channel_id: ChannelId,
    pub rank: i32,
    pub relevance_score: String,
    pub reasoning: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<SimilarChannel> for SimilarChannelResponse {
    fn from(row: SimilarChannel) -> Self {
        Self {
            similar_channel_id: row.similar_channel_id,
            rank: row.rank,
            relevance_score: row.relevance_score,
            reasoning: row.reasoning,
            updated_at: row.updated_at,
        }
    }
}

/// Competitor list response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarChannelListResponse {
    /// The caller's channel.
    pub owner_channel_id: ChannelId,
    /// Ordered by rank.
    pub similar: Vec<SimilarChannelResponse>,
}

/// List the competitors discovered for one of the caller's channels.
pub async fn list_similar_channels(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<SimilarChannelsQuery>,
) -> Result<Json<SimilarChannelListResponse>, ApiError> {
    let owner = parse_channel_id(&query.owner_channel_id)?;
    owned_channel(&state, &auth.user_id, &owner).await?;

    let rows = state.store.list_similar_channels(&owner).await?;

    Ok(Json(SimilarChannelListResponse {
        owner_channel_id: owner,
        similar: rows.into_iter().map(SimilarChannelResponse::from).collect(),
    }))
}
