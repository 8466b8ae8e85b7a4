//! Comment critique for a single video.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{types, AgentFeature, CommentCritiquePayload};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

const UNKNOWN_SENTIMENT: &str = "Unknown";
const EMPTY_BREAKDOWN: &str = "0% Positive | 0% Neutral | 0% Negative";
const DEFAULT_TREND: &str = "Analysis completed";

/// Critique request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiqueRequest {
    /// YouTube video id.
    #[serde(alias = "yt_video_id")]
    pub yt_video_id: String,
}

/// Critique of a video's comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiqueResponse {
    /// Free-form analysis.
    pub response_text: String,
    /// Overall sentiment label.
    pub overall_sentiment: String,
    /// Positive, neutral and negative shares.
    pub sentiment_breakdown: String,
    /// Recurring praise.
    pub top_positive_themes: Vec<Value>,
    /// Recurring complaints.
    pub top_negative_themes: Vec<Value>,
    /// Direction of viewer sentiment.
    pub trend: String,
}

impl CritiqueResponse {
    /// Shape an agent reply, filling every field the agent left out.
    ///
    /// A structured reply is read by the agent's labels; a text reply becomes
    /// the response text.
    #[must_use]
    pub fn from_reply(reply: Option<&Value>) -> Self {
        let text_field = |key: &str, default: &str| {
            reply
                .and_then(|r| r.get(key))
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        let list_field = |key: &str| {
            reply
                .and_then(|r| r.get(key))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };

        let response_text = match reply {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Object(fields)) => match fields.get("response_text") {
                Some(Value::String(text)) => text.clone(),
                None | Some(Value::Null) => String::new(),
                Some(other) => other.to_string(),
            },
            _ => String::new(),
        };

        Self {
            response_text,
            overall_sentiment: text_field("Overall Sentiment:", UNKNOWN_SENTIMENT),
            sentiment_breakdown: text_field("Sentiment Breakdown", EMPTY_BREAKDOWN),
            top_positive_themes: list_field("Top Positive Themes"),
            top_negative_themes: list_field("Top Negative Themes"),
            trend: text_field("Trend:", DEFAULT_TREND),
        }
    }
}

/// Ask the analysis agent to critique a video's comments.
pub async fn critique_comments(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CritiqueRequest>,
) -> Result<Json<CritiqueResponse>, ApiError> {
    let video_id = body.yt_video_id.trim();
    if video_id.is_empty() {
        return Err(ApiError::BadRequest("yt_video_id is required".into()));
    }

    let feature = AgentFeature::AnalyzeComments;
    state.agents.ensure_configured(feature)?;

    let reply = state
        .agents
        .reply(feature, &CommentCritiquePayload::new(video_id))
        .await?;

    tracing::info!(user_id = %auth.user_id, yt_video_id = %video_id, "Comments critiqued");

    Ok(Json(CritiqueResponse::from_reply(reply.at(types::COMMENT_REPLY))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_reply_keeps_valid_fields() {
        let reply = json!({
            "response_text": "Audio is too quiet.",
            "Overall Sentiment:": "Mixed",
            "Sentiment Breakdown": 42,
            "Top Positive Themes": ["editing"],
            "Top Negative Themes": "audio",
            "Trend:": "Improving"
        });

        let critique = CritiqueResponse::from_reply(Some(&reply));

        assert_eq!(critique.response_text, "Audio is too quiet.");
        assert_eq!(critique.overall_sentiment, "Mixed");
        assert_eq!(critique.sentiment_breakdown, EMPTY_BREAKDOWN);
        assert_eq!(critique.top_positive_themes, vec![json!("editing")]);
        assert!(critique.top_negative_themes.is_empty());
        assert_eq!(critique.trend, "Improving");
    }

    #[test]
    fn text_reply_becomes_response_text() {
        let critique = CritiqueResponse::from_reply(Some(&json!("Viewers want captions.")));
        assert_eq!(critique.response_text, "Viewers want captions.");
        assert_eq!(critique.overall_sentiment, UNKNOWN_SENTIMENT);
        assert_eq!(critique.trend, DEFAULT_TREND);
    }

    #[test]
    fn non_text_response_is_serialized() {
        let critique =
            CritiqueResponse::from_reply(Some(&json!({ "response_text": { "issues": 2 } })));
        assert_eq!(critique.response_text, r#"{"issues":2}"#);
    }

    #[test]
    fn missing_reply_gets_defaults() {
        let critique = CritiqueResponse::from_reply(None);
        assert_eq!(critique.response_text, "");
        assert_eq!(critique.sentiment_breakdown, EMPTY_BREAKDOWN);
    }
}
