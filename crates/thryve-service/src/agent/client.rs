//! Agent HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::types::{AgentAccepted, AgentFeature, AgentKind, AgentReply, ACCEPTED_REQUEST_ID};

/// Error type for agent calls.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Transport failure before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call exceeded the configured timeout and was cancelled.
    #[error("agent call timed out")]
    Timeout,

    /// The agent answered with a non-success status.
    #[error("agent returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, or `{ "message": <text> }` when not JSON.
        body: Value,
    },

    /// The agent answered without the field the caller needs.
    #[error("agent response missing {field}")]
    MissingField {
        /// JSON pointer that was absent.
        field: &'static str,
        /// Response body.
        body: Value,
    },

    /// No base URL is configured for the agent serving this feature.
    #[error("{0} agent is not configured")]
    NotConfigured(&'static str),
}

/// Client for the content and analysis agents.
///
/// Every call is bounded by the same timeout; a timed-out call is cancelled.
#[derive(Debug, Clone)]
pub struct AgentClient {
    client: Client,
    content_url: Option<String>,
    analysis_url: Option<String>,
    callback_url: String,
}

impl AgentClient {
    /// Create a new agent client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        content_url: Option<String>,
        analysis_url: Option<String>,
        callback_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            content_url: content_url.map(|u| u.trim_end_matches('/').to_string()),
            analysis_url: analysis_url.map(|u| u.trim_end_matches('/').to_string()),
            callback_url: callback_url.into(),
        })
    }

    /// URL agents call back on when an asynchronous job finishes.
    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Fail early when the agent serving `feature` has no base URL.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NotConfigured`.
    pub fn ensure_configured(&self, feature: AgentFeature) -> Result<(), AgentError> {
        self.base_url(feature.agent()).map(|_| ())
    }

    fn base_url(&self, kind: AgentKind) -> Result<&str, AgentError> {
        let url = match kind {
            AgentKind::Content => self.content_url.as_deref(),
            AgentKind::Analysis => self.analysis_url.as_deref(),
        };
        url.filter(|u| !u.is_empty())
            .ok_or(AgentError::NotConfigured(kind.name()))
    }

    /// Start an asynchronous job and return its request id.
    pub async fn submit<P: Serialize + Sync>(
        &self,
        feature: AgentFeature,
        payload: &P,
    ) -> Result<AgentAccepted, AgentError> {
        let body = self.post(feature, payload).await?;

        let request_id = body
            .pointer(ACCEPTED_REQUEST_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from);

        match request_id {
            Some(request_id) => {
                tracing::debug!(feature = ?feature, request_id = %request_id, "Agent accepted job");
                Ok(AgentAccepted { request_id })
            }
            None => Err(AgentError::MissingField {
                field: ACCEPTED_REQUEST_ID,
                body,
            }),
        }
    }

    /// Call a synchronous feature and return the full reply.
    pub async fn reply<P: Serialize + Sync>(
        &self,
        feature: AgentFeature,
        payload: &P,
    ) -> Result<AgentReply, AgentError> {
        let body = self.post(feature, payload).await?;
        Ok(AgentReply { body })
    }

    async fn post<P: Serialize + Sync>(
        &self,
        feature: AgentFeature,
        payload: &P,
    ) -> Result<Value, AgentError> {
        let url = format!("{}{}", self.base_url(feature.agent())?, feature.path());

        tracing::debug!(url = %url, "Calling agent");

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let text = response.text().await.map_err(classify)?;
        let body: Value =
            serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "message": text }));

        if !status.is_success() {
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

fn classify(err: reqwest::Error) -> AgentError {
    if err.is_timeout() {
        AgentError::Timeout
    } else {
        AgentError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(content: Option<String>) -> AgentClient {
        AgentClient::new(content, None, "https://app/webhooks/agent", Duration::from_secs(2))
            .unwrap()
    }

    #[test]
    fn unconfigured_agent_is_reported() {
        let client = client(None);
        assert!(matches!(
            client.ensure_configured(AgentFeature::ReelsMaking),
            Err(AgentError::NotConfigured("content"))
        ));
        assert!(matches!(
            client.ensure_configured(AgentFeature::CompetitorFind),
            Err(AgentError::NotConfigured("analysis"))
        ));
    }

    #[tokio::test]
    async fn submit_extracts_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Reels_Making"))
            .and(body_json(json!({"x": 1})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": {"Response": {"request_id": "r1"}}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let accepted = client(Some(server.uri()))
            .submit(AgentFeature::ReelsMaking, &json!({"x": 1}))
            .await
            .unwrap();
        assert_eq!(accepted.request_id, "r1");
    }

    #[tokio::test]
    async fn submit_without_request_id_is_missing_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .mount(&server)
            .await;

        let err = client(Some(server.uri()))
            .submit(AgentFeature::VoiceFromText, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingField { .. }));
    }

    #[tokio::test]
    async fn non_success_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(Some(server.uri()))
            .reply(AgentFeature::VideoPlan, &json!({}))
            .await
            .unwrap_err();
        match err {
            AgentError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, json!({"message": "overloaded"}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_agent_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = AgentClient::new(
            Some(server.uri()),
            None,
            "",
            Duration::from_millis(50),
        )
        .unwrap();
        let err = client
            .reply(AgentFeature::VideoSeo, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout));
    }
}
