//! Agent request payloads and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON pointer to the request id of an accepted asynchronous job.
pub const ACCEPTED_REQUEST_ID: &str = "/result/Response/request_id";

/// JSON pointer to the competitor list of a discovery reply.
pub const DISCOVERY_COMPETITORS: &str = "/result/Output/competitors/videoList";

/// JSON pointer to the text reply of plan and SEO calls.
pub const REPLY: &str = "/result/Reply";

/// JSON pointer to the output of a CTR prediction.
pub const OUTPUT: &str = "/result/Output";

/// JSON pointer to the reply of a comment critique.
pub const COMMENT_REPLY: &str = "/result/Output/reply";

/// Instructions sent with every comment critique.
pub const COMMENT_CRITIQUE_PROMPT: &str = "Analyze the following YouTube video comments \
carefully. Identify the actual issues viewers are pointing out with my videos. Go beyond \
surface-level sentiment (like 'good video' or 'bad video') and focus on constructive criticism \
or recurring complaints. Highlight specific problems related to video quality (audio, visuals, \
editing, pacing), content quality (clarity, depth, accuracy, usefulness), presentation (tone, \
energy, communication style), or technical issues (length, captions, accessibility, \
clickbait). Provide me with a clear breakdown of the issues mentioned, patterns across \
multiple comments, and actionable suggestions I can use to improve my future videos.";

/// Fixed art direction appended to every thumbnail prompt.
pub const THUMBNAIL_STYLE_PROMPT: &str = "Create an ultra HD 4K YouTube thumbnail image in a \
high-impact cinematic style using ONLY the provided images as sources. Do not include any \
text, numbers, or watermarks, only visuals. Ensure the composition has a clear central \
subject, dramatic lighting, vibrant contrast, and sharp edge definition. Match the \
platform-accurate 16:9 aspect ratio and enhance clarity for maximum thumbnail appeal.";

/// Maximum number of source images sent to the thumbnail agent.
pub const MAX_THUMBNAIL_IMAGES: usize = 3;

/// The two agent deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Voice, thumbnail, reel, plan and SEO.
    Content,
    /// Competitor discovery, CTR prediction and comment critique.
    Analysis,
}

impl AgentKind {
    /// Name used in logs and configuration errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Analysis => "analysis",
        }
    }
}

/// One agent endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentFeature {
    /// Text to speech.
    VoiceFromText,
    /// Thumbnail image generation.
    ThumbnailMake,
    /// Short video assembly.
    ReelsMaking,
    /// Production plan for an idea.
    VideoPlan,
    /// SEO metadata for an idea.
    VideoSeo,
    /// Competitor channel discovery.
    CompetitorFind,
    /// Click-through rate prediction.
    CtrPredict,
    /// Critique of one video's comments.
    AnalyzeComments,
}

impl AgentFeature {
    /// Endpoint path appended to the agent base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::VoiceFromText => "/Voice_from_text",
            Self::ThumbnailMake => "/Thumbnail_Make",
            Self::ReelsMaking => "/Reels_Making",
            Self::VideoPlan => "/Video_Plan",
            Self::VideoSeo => "/Video_SEO",
            Self::CompetitorFind => "/competitor_find",
            Self::CtrPredict => "/CTR_Predict",
            Self::AnalyzeComments => "/Analyze_Single_Video_Comments",
        }
    }

    /// Deployment serving this endpoint.
    #[must_use]
    pub const fn agent(self) -> AgentKind {
        match self {
            Self::CompetitorFind | Self::CtrPredict | Self::AnalyzeComments => AgentKind::Analysis,
            _ => AgentKind::Content,
        }
    }
}

/// An asynchronous job the agent accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentAccepted {
    /// Correlation id echoed back in the completion callback.
    pub request_id: String,
}

/// A synchronous agent answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    /// Full response body.
    pub body: Value,
}

impl AgentReply {
    /// Value at a JSON pointer, treating `null` as absent.
    #[must_use]
    pub fn at(&self, pointer: &str) -> Option<&Value> {
        self.body.pointer(pointer).filter(|v| !v.is_null())
    }
}

/// `POST /Voice_from_text`
#[derive(Debug, Serialize)]
pub struct VoicePayload<'a> {
    /// Text to speak.
    pub text: &'a str,
    /// Reference voice sample.
    pub ref_audio_url: &'a str,
    /// Completion callback.
    pub fal_webhook: &'a str,
}

/// `POST /Thumbnail_Make`
#[derive(Debug, Serialize)]
pub struct ThumbnailPayload<'a> {
    /// Source images.
    pub images: &'a [String],
    /// User prompt followed by the fixed style prompt.
    pub prompt: String,
    /// Completion callback.
    pub fal_webhook: &'a str,
}

impl<'a> ThumbnailPayload<'a> {
    /// Build a payload, combining the user prompt with the style prompt.
    #[must_use]
    pub fn new(images: &'a [String], user_prompt: Option<&str>, fal_webhook: &'a str) -> Self {
        let prompt = match user_prompt.map(str::trim).filter(|p| !p.is_empty()) {
            Some(user) => format!("{user}\n\n{THUMBNAIL_STYLE_PROMPT}"),
            None => THUMBNAIL_STYLE_PROMPT.to_string(),
        };
        let images = &images[..images.len().min(MAX_THUMBNAIL_IMAGES)];
        Self {
            images,
            prompt,
            fal_webhook,
        }
    }
}

/// `POST /Reels_Making`
#[derive(Debug, Serialize)]
pub struct ReelPayload<'a> {
    /// Creative direction.
    pub prompt: &'a str,
    /// Source media.
    pub image_urls: &'a [String],
    /// Completion callback.
    pub fal_webhook: &'a str,
}

/// `POST /competitor_find`
#[derive(Debug, Serialize)]
pub struct CompetitorPayload<'a> {
    /// Channel to find competitors for.
    pub yt_channel_id: &'a str,
}

/// `POST /Video_Plan`
#[derive(Debug, Serialize)]
pub struct PlanPayload<'a> {
    /// Idea context.
    pub context: &'a Value,
    /// Publishing schedule, `null` when absent.
    #[serde(rename = "scheduleData")]
    pub schedule_data: Option<&'a Value>,
}

/// `POST /Video_SEO`
#[derive(Debug, Serialize)]
pub struct SeoPayload<'a> {
    /// The idea to optimize.
    #[serde(rename = "videoIdea")]
    pub video_idea: &'a Value,
}

/// `POST /CTR_Predict`
#[derive(Debug, Serialize)]
pub struct CtrPayload<'a> {
    /// Title or concept.
    pub prompt: &'a str,
    /// Thumbnail image URL.
    pub image: &'a str,
}

/// `POST /Analyze_Single_Video_Comments`
#[derive(Debug, Serialize)]
pub struct CommentCritiquePayload<'a> {
    /// Analysis instructions.
    #[serde(rename = "Prompt")]
    pub prompt: &'static str,
    /// Video whose comments are analyzed.
    pub yt_video_id: &'a str,
}

impl<'a> CommentCritiquePayload<'a> {
    /// Payload for `yt_video_id` with the fixed instructions.
    #[must_use]
    pub const fn new(yt_video_id: &'a str) -> Self {
        Self {
            prompt: COMMENT_CRITIQUE_PROMPT,
            yt_video_id,
        }
    }
}

/// One entry of a discovery reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Competitor {
    /// Position in the agent's ranking.
    #[serde(default)]
    pub rank: Option<i32>,
    /// Competitor channel id.
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub channel_name: Option<String>,
    /// Channel description.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form relevance label such as "high".
    #[serde(default)]
    pub relevance_score: Option<String>,
    /// Why the agent picked this channel.
    #[serde(default)]
    pub reasoning: Option<String>,
}
