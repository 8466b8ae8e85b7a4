//! Video ideas and their plan and SEO enrichment.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use thryve_core::{ChannelId, IdeaId, Operation, UserId, VideoIdea};
use thryve_store::Store;

use crate::agent::{types, AgentFeature, PlanPayload, SeoPayload};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::ledger::Debit;
use crate::orchestrator::{call_metered, owned_channel, parse_channel_id};
use crate::state::AppState;

/// A video idea as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaResponse {
    /// Idea id.
    pub id: IdeaId,
    /// Channel the idea is for.
    pub channel_id: ChannelId,
    /// Working title.
    pub title: String,
    /// Short description.
    pub description: Option<String>,
    /// Production plan.
    pub plan: Option<Value>,
    /// SEO suggestions.
    pub seo: Option<Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<VideoIdea> for IdeaResponse {
    fn from(idea: VideoIdea) -> Self {
        Self {
            id: idea.id,
            channel_id: idea.channel_id,
            title: idea.title,
            description: idea.description,
            plan: idea.plan,
            seo: idea.seo,
            created_at: idea.created_at,
            updated_at: idea.updated_at,
        }
    }
}

/// Idea creation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdeaRequest {
    /// Target channel.
    pub channel_id: String,
    /// Working title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Save a video idea.
pub async fn create_idea(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateIdeaRequest>,
) -> Result<(StatusCode, Json<IdeaResponse>), ApiError> {
    let channel_id = parse_channel_id(&body.channel_id)?;

    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }

    owned_channel(&state, &auth.user_id, &channel_id).await?;

    let idea = VideoIdea::new(auth.user_id, channel_id, body.title, body.description);
    state.store.insert_idea(&idea).await?;

    Ok((StatusCode::CREATED, Json(IdeaResponse::from(idea))))
}

/// Idea list query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListIdeasQuery {
    /// Channel to list ideas for.
    pub channel_id: String,
}

/// Idea list response.
#[derive(Debug, Serialize)]
pub struct IdeaListResponse {
    /// Ideas, newest first.
    pub ideas: Vec<IdeaResponse>,
}

/// List the caller's ideas for one channel.
pub async fn list_ideas(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListIdeasQuery>,
) -> Result<Json<IdeaListResponse>, ApiError> {
    let channel_id = parse_channel_id(&query.channel_id)?;
    owned_channel(&state, &auth.user_id, &channel_id).await?;

    let ideas = state.store.list_ideas(&auth.user_id, &channel_id).await?;

    Ok(Json(IdeaListResponse {
        ideas: ideas.into_iter().map(IdeaResponse::from).collect(),
    }))
}

/// Plan request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    /// Idea to plan.
    pub idea_id: String,
    /// Context passed to the agent as-is.
    pub context: Value,
    /// Publishing schedule.
    #[serde(default)]
    pub schedule_data: Option<Value>,
}

/// Enrichment response.
#[derive(Debug, Serialize)]
pub struct EnrichIdeaResponse {
    /// Always `true`.
    pub success: bool,
    /// The updated idea.
    pub idea: IdeaResponse,
}

/// Generate and store a production plan for an idea.
pub async fn generate_plan(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<GeneratePlanRequest>,
) -> Result<Json<EnrichIdeaResponse>, ApiError> {
    if is_blank(&body.context) {
        return Err(ApiError::BadRequest("context is required".into()));
    }

    let idea = owned_idea(&state, &auth.user_id, &body.idea_id).await?;

    let payload = PlanPayload {
        context: &body.context,
        schedule_data: body.schedule_data.as_ref().filter(|v| !v.is_null()),
    };

    let (reply, debit) = call_metered(
        &state,
        &auth.user_id,
        Operation::IdeasGeneratePlan,
        AgentFeature::VideoPlan,
        &payload,
        Some(types::REPLY),
    )
    .await?;

    let plan = reply.at(types::REPLY).cloned().unwrap_or(Value::Null);
    let stored = state.store.set_idea_plan(&idea.id, &plan).await;
    let idea = store_or_compensate(&state, &debit, stored).await?;

    tracing::info!(user_id = %auth.user_id, idea_id = %idea.id, "Idea plan generated");

    Ok(Json(EnrichIdeaResponse {
        success: true,
        idea: IdeaResponse::from(idea),
    }))
}

/// SEO request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSeoRequest {
    /// Idea to optimize.
    pub idea_id: String,
    /// Idea description sent to the agent; built from the stored idea when
    /// absent.
    #[serde(default)]
    pub video_idea: Option<Value>,
}

/// Generate and store SEO suggestions for an idea.
pub async fn generate_seo(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<GenerateSeoRequest>,
) -> Result<Json<EnrichIdeaResponse>, ApiError> {
    let idea = owned_idea(&state, &auth.user_id, &body.idea_id).await?;

    let video_idea = match body.video_idea {
        Some(v) if !is_blank(&v) => v,
        _ => json!({
            "title": idea.title,
            "description": idea.description,
        }),
    };

    let (reply, debit) = call_metered(
        &state,
        &auth.user_id,
        Operation::IdeasGenerateSeo,
        AgentFeature::VideoSeo,
        &SeoPayload {
            video_idea: &video_idea,
        },
        Some(types::REPLY),
    )
    .await?;

    let seo = reply.at(types::REPLY).cloned().unwrap_or(Value::Null);
    let stored = state.store.set_idea_seo(&idea.id, &seo).await;
    let idea = store_or_compensate(&state, &debit, stored).await?;

    tracing::info!(user_id = %auth.user_id, idea_id = %idea.id, "Idea SEO generated");

    Ok(Json(EnrichIdeaResponse {
        success: true,
        idea: IdeaResponse::from(idea),
    }))
}

async fn owned_idea(state: &AppState, user_id: &UserId, raw: &str) -> Result<VideoIdea, ApiError> {
    let not_found = || ApiError::NotFound("Idea not found".into());
    let idea_id: IdeaId = raw.parse().map_err(|_| not_found())?;
    state
        .store
        .get_idea(&idea_id)
        .await?
        .filter(|idea| &idea.user_id == user_id)
        .ok_or_else(not_found)
}

async fn store_or_compensate(
    state: &AppState,
    debit: &Debit,
    stored: thryve_store::Result<VideoIdea>,
) -> Result<VideoIdea, ApiError> {
    match stored {
        Ok(idea) => Ok(idea),
        Err(e) => {
            tracing::error!(
                user_id = %debit.user_id,
                operation = %debit.operation,
                error = %e,
                "Failed to store agent reply"
            );
            state
                .ledger
                .compensate(debit, "agent reply could not be stored")
                .await;
            Err(e.into())
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!("  ")));
        assert!(is_blank(&json!({})));
        assert!(!is_blank(&json!("launch vlog")));
        assert!(!is_blank(&json!({"topic": "rust"})));
        assert!(!is_blank(&json!([])));
    }
}
