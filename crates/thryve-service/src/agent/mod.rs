//! External AI agent integration.
//!
//! Asynchronous features (voice, thumbnail, reel) are accepted with a request
//! id and completed later through the agent webhook. Synchronous features
//! (discovery, plan, SEO, CTR, comment critique) answer in the same call.

pub mod client;
pub mod types;

pub use client::{AgentClient, AgentError};
pub use types::{
    AgentAccepted, AgentFeature, AgentKind, AgentReply, CommentCritiquePayload, Competitor,
    CompetitorPayload, CtrPayload, PlanPayload, ReelPayload, SeoPayload, ThumbnailPayload,
    VoicePayload,
};
