//! Competitor channel discovery.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use thryve_core::{ChannelId, Operation, SimilarChannel};
use thryve_store::Store;

use crate::agent::{types, AgentFeature, AgentReply, Competitor, CompetitorPayload};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::orchestrator::{call_metered, owned_channel, parse_channel_id};
use crate::state::AppState;

/// Discovery request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverRequest {
    /// The caller's channel to find competitors for.
    pub owner_channel_id: String,
}

/// Discovery response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    /// Always `true`.
    pub success: bool,
    /// Number of associations written.
    pub similar_count: usize,
}

/// Ask the analysis agent for competitors and store them.
pub async fn discover_similar_channels(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<DiscoverRequest>,
) -> Result<Json<DiscoverResponse>, ApiError> {
    let owner = parse_channel_id(&body.owner_channel_id)?;
    owned_channel(&state, &auth.user_id, &owner).await?;

    let payload = CompetitorPayload {
        yt_channel_id: owner.as_str(),
    };

    let (reply, debit) = call_metered(
        &state,
        &auth.user_id,
        Operation::SimilarChannelsDiscover,
        AgentFeature::CompetitorFind,
        &payload,
        None,
    )
    .await?;

    let rows = similar_rows(&owner, &reply);

    let similar_count = match state.store.upsert_similar_channels(&rows).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(
                user_id = %auth.user_id,
                owner_channel_id = %owner,
                error = %e,
                "Failed to store discovered channels"
            );
            state
                .ledger
                .compensate(&debit, "discovered channels could not be stored")
                .await;
            return Err(e.into());
        }
    };

    tracing::info!(
        user_id = %auth.user_id,
        owner_channel_id = %owner,
        similar_count,
        "Similar channels discovered"
    );

    Ok(Json(DiscoverResponse {
        success: true,
        similar_count,
    }))
}

/// Turn the agent's competitor list into association rows.
///
/// A missing list is an empty result. Entries without a usable channel id,
/// the owner itself and repeats are skipped.
fn similar_rows(owner: &ChannelId, reply: &AgentReply) -> Vec<SimilarChannel> {
    let Some(Value::Array(items)) = reply.at(types::DISCOVERY_COMPETITORS) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| serde_json::from_value::<Competitor>(item.clone()).ok())
        .filter_map(|c| {
            let id = ChannelId::new(c.channel_id?).ok()?;
            if &id == owner || !seen.insert(id.clone()) {
                return None;
            }
            Some(SimilarChannel::new(
                owner.clone(),
                id,
                c.rank,
                c.relevance_score,
                c.reasoning,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner() -> ChannelId {
        ChannelId::new("UC_owner").unwrap()
    }

    fn reply(list: Value) -> AgentReply {
        AgentReply {
            body: json!({ "result": { "Output": { "competitors": { "videoList": list } } } }),
        }
    }

    #[test]
    fn rows_apply_defaults() {
        let rows = similar_rows(
            &owner(),
            &reply(json!([
                { "channel_id": "UC_a", "rank": 1, "relevance_score": "high", "reasoning": "same niche" },
                { "channel_id": "UC_b" }
            ])),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].relevance_score, "high");
        assert_eq!(rows[1].rank, 0);
        assert_eq!(rows[1].relevance_score, "unknown");
        assert!(rows[1].reasoning.is_none());
    }

    #[test]
    fn rows_skip_invalid_and_duplicate_entries() {
        let rows = similar_rows(
            &owner(),
            &reply(json!([
                { "channel_id": "UC_a", "rank": 1 },
                { "channel_id": "UC_a", "rank": 2 },
                { "channel_name": "no id" },
                { "channel_id": "" },
                { "channel_id": "UC_owner" },
                "garbage"
            ])),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].similar_channel_id.as_str(), "UC_a");
        assert_eq!(rows[0].rank, 1);
    }

    #[test]
    fn missing_list_is_empty() {
        let reply = AgentReply {
            body: json!({ "result": { "Output": {} } }),
        };
        assert!(similar_rows(&owner(), &reply).is_empty());
    }
}
