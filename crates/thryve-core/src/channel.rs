//! Channel and similar-channel types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChannelId, UserId};

/// Relevance annotation used when the discovery agent omits one.
pub const UNKNOWN_RELEVANCE: &str = "unknown";

/// A YouTube channel linked by a user.
///
/// Display metadata is a cached copy and is not authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// YouTube channel id.
    pub channel_id: ChannelId,

    /// Owning user.
    pub user_id: UserId,

    /// Channel title.
    pub title: String,

    /// Channel description.
    pub description: Option<String>,

    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,

    /// Cached subscriber count.
    pub subscriber_count: i64,

    /// Cached video count.
    pub video_count: i64,

    /// Cached view count.
    pub view_count: i64,

    /// When the channel was linked.
    pub created_at: DateTime<Utc>,

    /// When the cached metadata was last refreshed.
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    /// Create a channel with empty statistics.
    #[must_use]
    pub fn new(channel_id: ChannelId, user_id: UserId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            channel_id,
            user_id,
            title: title.into(),
            description: None,
            thumbnail_url: None,
            subscriber_count: 0,
            video_count: 0,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the channel belongs to the given user.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}

/// A competitor association produced by channel discovery.
///
/// Keyed by `(owner_channel_id, similar_channel_id)`; re-discovery updates the
/// row in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarChannel {
    /// The user's own channel.
    pub owner_channel_id: ChannelId,

    /// The competitor channel.
    pub similar_channel_id: ChannelId,

    /// Rank assigned by the agent (lower is closer).
    pub rank: i32,

    /// Relevance annotation (e.g. "high", "medium").
    pub relevance_score: String,

    /// Free-text reasoning from the agent.
    pub reasoning: Option<String>,

    /// When the association was first discovered.
    pub created_at: DateTime<Utc>,

    /// When the association was last refreshed.
    pub updated_at: DateTime<Utc>,
}

impl SimilarChannel {
    /// Build an association, applying the defaults for missing rank/relevance.
    #[must_use]
    pub fn new(
        owner_channel_id: ChannelId,
        similar_channel_id: ChannelId,
        rank: Option<i32>,
        relevance_score: Option<String>,
        reasoning: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            owner_channel_id,
            similar_channel_id,
            rank: rank.unwrap_or(0),
            relevance_score: relevance_score
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_RELEVANCE.to_string()),
            reasoning,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similar_channel_defaults() {
        let row = SimilarChannel::new(
            ChannelId::new("o1").unwrap(),
            ChannelId::new("c1").unwrap(),
            None,
            Some(String::new()),
            None,
        );
        assert_eq!(row.rank, 0);
        assert_eq!(row.relevance_score, UNKNOWN_RELEVANCE);
    }

    #[test]
    fn ownership_check() {
        let alice = UserId::new("alice").unwrap();
        let bob = UserId::new("bob").unwrap();
        let channel = Channel::new(ChannelId::new("UC1").unwrap(), alice.clone(), "Main");
        assert!(channel.is_owned_by(&alice));
        assert!(!channel.is_owned_by(&bob));
    }
}
