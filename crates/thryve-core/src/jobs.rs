//! Job record types.
//!
//! A job record tracks one unit of agent-performed work. All job kinds share a
//! single shape and lifecycle and are told apart by [`JobKind`]. Records are
//! correlated with agent callbacks by their `generator_id`, which is unique
//! across every kind.
//!
//! # Lifecycle
//!
//! ```text
//! PROCESSING --(callback "OK")------> COMPLETED
//! PROCESSING --(callback otherwise)--> FAILED
//! ```
//!
//! Terminal states never change again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChannelId, IdeaId, JobId, UserId};

/// Asset type recorded for generated voice-overs.
pub const AUDIO_ASSET_TYPE: &str = "mp3";

/// Asset type recorded for video media attached to a reel.
pub const VIDEO_ASSET_TYPE: &str = "mp4";

/// Asset type recorded for image media attached to a reel.
pub const IMAGE_ASSET_TYPE: &str = "image";

/// Kind of job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Generic asset (generated audio or a direct upload).
    Asset,
    /// Generated thumbnail image.
    Thumbnail,
    /// Generated reel video.
    Reel,
    /// Media item belonging to a reel.
    ReelAsset,
}

impl JobKind {
    /// Stable string form used in storage and query strings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Thumbnail => "thumbnail",
            Self::Reel => "reel",
            Self::ReelAsset => "reel_asset",
        }
    }

    /// Prefix used when a generator id is synthesized locally.
    #[must_use]
    pub const fn local_prefix(&self) -> &'static str {
        match self {
            Self::Asset => "upl",
            Self::Thumbnail => "thumb",
            Self::Reel => "reel",
            Self::ReelAsset => "reel_asset",
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = crate::ThryveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset" => Ok(Self::Asset),
            "thumbnail" => Ok(Self::Thumbnail),
            "reel" => Ok(Self::Reel),
            "reel_asset" => Ok(Self::ReelAsset),
            other => Err(crate::ThryveError::InvalidValue(format!(
                "unknown job kind: {other}"
            ))),
        }
    }
}

/// Lifecycle status of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Submitted to an agent, awaiting its callback.
    Processing,
    /// Agent reported success.
    Completed,
    /// Agent reported anything other than success.
    Failed,
}

impl JobStatus {
    /// Normalize a status reported by an agent callback.
    ///
    /// Only the exact token `OK` (any case, no padding) means success.
    /// Anything else, including a missing status, is a failure.
    #[must_use]
    pub fn from_callback(status: Option<&str>) -> Self {
        match status {
            Some(s) if s.eq_ignore_ascii_case("ok") => Self::Completed,
            _ => Self::Failed,
        }
    }

    /// Whether the status is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is a valid lifecycle transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        !self.is_terminal() && next.is_terminal()
    }

    /// Stable string form used in storage and query strings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = crate::ThryveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(crate::ThryveError::InvalidValue(format!(
                "unknown job status: {other}"
            ))),
        }
    }
}

/// A persisted job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Internal id.
    pub id: JobId,

    /// Correlation id issued by the agent, or synthesized for local jobs.
    pub generator_id: String,

    /// Job kind.
    pub kind: JobKind,

    /// Owning user.
    pub user_id: UserId,

    /// Channel the job was submitted for.
    pub channel_id: ChannelId,

    /// Lifecycle status.
    pub status: JobStatus,

    /// Result URL, set on completion (or at creation for local jobs).
    pub url: Option<String>,

    /// Title (reels).
    pub title: Option<String>,

    /// Description (reels).
    pub description: Option<String>,

    /// Asset type (`mp3`, `mp4`, `image`, ...).
    pub asset_type: Option<String>,

    /// Parent reel for reel assets.
    pub parent_id: Option<JobId>,

    /// Video idea the job was produced for.
    pub video_idea_id: Option<IdeaId>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A record for a job the agent accepted and is still working on.
    #[must_use]
    pub fn processing(
        kind: JobKind,
        generator_id: impl Into<String>,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::generate(),
            generator_id: generator_id.into(),
            kind,
            user_id,
            channel_id,
            status: JobStatus::Processing,
            url: None,
            title: None,
            description: None,
            asset_type: None,
            parent_id: None,
            video_idea_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A record completed locally, with a synthesized generator id.
    #[must_use]
    pub fn completed_locally(
        kind: JobKind,
        user_id: UserId,
        channel_id: ChannelId,
        url: Option<String>,
    ) -> Self {
        let mut record = Self::processing(kind, local_generator_id(kind), user_id, channel_id);
        record.status = JobStatus::Completed;
        record.url = url;
        record
    }

    /// Set title and description.
    #[must_use]
    pub fn with_details(mut self, title: Option<String>, description: Option<String>) -> Self {
        self.title = title;
        self.description = description;
        self
    }

    /// Set the asset type.
    #[must_use]
    pub fn with_asset_type(mut self, asset_type: impl Into<String>) -> Self {
        self.asset_type = Some(asset_type.into());
        self
    }

    /// Attach to a parent reel.
    #[must_use]
    pub fn with_parent(mut self, parent_id: JobId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Link to a video idea.
    #[must_use]
    pub fn with_video_idea(mut self, idea_id: Option<IdeaId>) -> Self {
        self.video_idea_id = idea_id;
        self
    }

    /// Whether a redelivered completion agrees with what is stored.
    #[must_use]
    pub fn matches_completion(&self, status: JobStatus, url: Option<&str>) -> bool {
        self.status == status && url.map_or(true, |u| self.url.as_deref() == Some(u))
    }
}

/// Synthesize a generator id for a job that never reaches an agent.
#[must_use]
pub fn local_generator_id(kind: JobKind) -> String {
    format!("{}_{}", kind.local_prefix(), uuid::Uuid::new_v4())
}

/// Classify reel media by its URL extension.
#[must_use]
pub fn media_asset_type(url: &str) -> &'static str {
    const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".webm", ".mov", ".avi"];
    let lower = url.to_ascii_lowercase();
    if VIDEO_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
        VIDEO_ASSET_TYPE
    } else {
        IMAGE_ASSET_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (UserId, ChannelId) {
        (UserId::new("alice").unwrap(), ChannelId::new("UC1").unwrap())
    }

    #[test]
    fn callback_status_normalization() {
        assert_eq!(JobStatus::from_callback(Some("OK")), JobStatus::Completed);
        assert_eq!(JobStatus::from_callback(Some("ok")), JobStatus::Completed);
        assert_eq!(JobStatus::from_callback(Some("Ok")), JobStatus::Completed);
        assert_eq!(JobStatus::from_callback(Some("ERROR")), JobStatus::Failed);
        assert_eq!(JobStatus::from_callback(Some("OKAY")), JobStatus::Failed);
        assert_eq!(JobStatus::from_callback(Some("")), JobStatus::Failed);
        assert_eq!(JobStatus::from_callback(Some(" OK ")), JobStatus::Failed);
        assert_eq!(JobStatus::from_callback(Some("OK\n")), JobStatus::Failed);
        assert_eq!(JobStatus::from_callback(None), JobStatus::Failed);
    }

    #[test]
    fn only_processing_transitions() {
        use JobStatus::{Completed, Failed, Processing};
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn local_records_are_completed_with_prefixed_ids() {
        let (user, channel) = ids();
        let record = JobRecord::completed_locally(
            JobKind::Asset,
            user,
            channel,
            Some("https://cdn/x.png".into()),
        );
        assert_eq!(record.status, JobStatus::Completed);
        assert!(record.generator_id.starts_with("upl_"));

        let reel_asset = local_generator_id(JobKind::ReelAsset);
        assert!(reel_asset.starts_with("reel_asset_"));
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        assert_eq!("completed".parse::<JobStatus>().unwrap(), JobStatus::Completed);
    }

    #[test]
    fn media_classification() {
        assert_eq!(media_asset_type("https://x/clip.MP4"), VIDEO_ASSET_TYPE);
        assert_eq!(media_asset_type("https://x/a.webm?sig=1"), VIDEO_ASSET_TYPE);
        assert_eq!(media_asset_type("https://x/photo.jpg"), IMAGE_ASSET_TYPE);
    }

    #[test]
    fn completion_agreement() {
        let (user, channel) = ids();
        let mut record = JobRecord::processing(JobKind::Reel, "r1", user, channel);
        record.status = JobStatus::Completed;
        record.url = Some("https://x/v.mp4".into());

        assert!(record.matches_completion(JobStatus::Completed, Some("https://x/v.mp4")));
        assert!(record.matches_completion(JobStatus::Completed, None));
        assert!(!record.matches_completion(JobStatus::Failed, None));
        assert!(!record.matches_completion(JobStatus::Completed, Some("https://x/other.mp4")));
    }
}
