//! Video idea types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChannelId, IdeaId, UserId};

/// A video idea attached to a channel, optionally enriched by agent output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoIdea {
    /// Internal id.
    pub id: IdeaId,

    /// Owning user.
    pub user_id: UserId,

    /// Channel the idea is planned for.
    pub channel_id: ChannelId,

    /// Working title.
    pub title: String,

    /// Short description.
    pub description: Option<String>,

    /// Production plan returned by the planning agent.
    pub plan: Option<serde_json::Value>,

    /// SEO keywords and suggestions returned by the SEO agent.
    pub seo: Option<serde_json::Value>,

    /// When the idea was created.
    pub created_at: DateTime<Utc>,

    /// When the idea was last updated.
    pub updated_at: DateTime<Utc>,
}

impl VideoIdea {
    /// Create a new idea without agent output.
    #[must_use]
    pub fn new(
        user_id: UserId,
        channel_id: ChannelId,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: IdeaId::generate(),
            user_id,
            channel_id,
            title: title.into(),
            description,
            plan: None,
            seo: None,
            created_at: now,
            updated_at: now,
        }
    }
}
