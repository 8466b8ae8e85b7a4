//! Service configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thryve_core::CreditCosts;

/// What happens to a debit when the work it paid for never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefundPolicy {
    /// Credits spent are kept even if the agent call fails.
    Never,
    /// Refund when the agent call fails or the job record cannot be saved.
    ///
    /// Jobs the agent accepted and later reported as failed are not refunded.
    #[default]
    OnAgentFailure,
}

impl RefundPolicy {
    /// Whether a failed agent call is refunded.
    #[must_use]
    pub const fn refunds_agent_failure(self) -> bool {
        matches!(self, Self::OnAgentFailure)
    }
}

impl FromStr for RefundPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "on_agent_failure" => Ok(Self::OnAgentFailure),
            other => Err(format!("unknown refund policy: {other}")),
        }
    }
}

impl fmt::Display for RefundPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("never"),
            Self::OnAgentFailure => f.write_str("on_agent_failure"),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,

    /// Identity provider base URL.
    pub auth_base_url: String,

    /// Expected JWT issuer (default: `auth_base_url`).
    pub auth_issuer: Option<String>,

    /// JWKS location (default: `<auth_base_url>/.well-known/jwks.json`).
    pub auth_jwks_url: Option<String>,

    /// Expected JWT audience (default: "thryve").
    pub auth_audience: String,

    /// Admin API key for privileged endpoints.
    pub admin_api_key: Option<String>,

    /// Base URL of the content agent (voice, thumbnail, reel, plan, SEO).
    pub content_agent_url: Option<String>,

    /// Base URL of the analysis agent (competitor discovery, CTR).
    pub analysis_agent_url: Option<String>,

    /// Public URL the agents call back on completion.
    pub agent_callback_url: String,

    /// Upper bound for every agent call, in seconds.
    pub agent_timeout_seconds: u64,

    /// Shared secret for `X-Webhook-Signature` on agent callbacks.
    pub agent_webhook_secret: Option<String>,

    /// Refund behavior for failed agent calls.
    pub refund_policy: RefundPolicy,

    /// Credits granted when a user is provisioned.
    pub signup_credits: i64,

    /// Credit cost table.
    pub credit_costs: CreditCosts,

    /// Stripe API key (optional).
    pub stripe_api_key: Option<String>,

    /// Stripe webhook secret (optional).
    pub stripe_webhook_secret: Option<String>,

    /// Stripe API base URL override.
    pub stripe_api_base: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds. Must exceed the agent timeout.
    pub request_timeout_seconds: u64,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    api_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    ///
    /// # Errors
    ///
    /// Returns an error if `REFUND_POLICY` is not recognized, the credit
    /// cost file cannot be loaded, or [`Self::validate`] fails.
    pub fn from_env() -> Result<Self, String> {
        let (stripe_api_key, stripe_webhook_secret) = load_stripe_secrets();

        let refund_policy = match std::env::var("REFUND_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => RefundPolicy::default(),
        };

        let credit_costs = match std::env::var("CREDIT_COSTS_FILE") {
            Ok(path) => {
                let costs = CreditCosts::from_json_file(&path).map_err(|e| e.to_string())?;
                tracing::info!(path = %path, "Loaded credit costs from file");
                costs
            }
            Err(_) => CreditCosts::default(),
        };

        let config = Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: std::env::var("DATABASE_URL").ok(),
            auth_base_url: std::env::var("AUTH_BASE_URL")
                .unwrap_or_else(|_| "https://auth.thryve.app".into()),
            auth_issuer: std::env::var("AUTH_ISSUER").ok(),
            auth_jwks_url: std::env::var("AUTH_JWKS_URL").ok(),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "thryve".into()),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            content_agent_url: std::env::var("CONTENT_AGENT_URL").ok(),
            analysis_agent_url: std::env::var("ANALYSIS_AGENT_URL").ok(),
            agent_callback_url: std::env::var("AGENT_CALLBACK_URL").unwrap_or_default(),
            agent_timeout_seconds: env_parse("AGENT_TIMEOUT_SECONDS", 120),
            agent_webhook_secret: std::env::var("AGENT_WEBHOOK_SECRET").ok(),
            refund_policy,
            signup_credits: env_parse("SIGNUP_CREDITS", 50),
            credit_costs,
            stripe_api_key,
            stripe_webhook_secret,
            stripe_api_base: std::env::var("STRIPE_API_BASE").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES", 1024 * 1024),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS", 150),
        };
        config.validate()?;
        Ok(config)
    }

    /// Issuer user tokens must carry.
    #[must_use]
    pub fn auth_issuer(&self) -> &str {
        self.auth_issuer.as_deref().unwrap_or(&self.auth_base_url)
    }

    /// Where the identity provider publishes its signing keys.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        self.auth_jwks_url.clone().unwrap_or_else(|| {
            format!(
                "{}/.well-known/jwks.json",
                self.auth_base_url.trim_end_matches('/')
            )
        })
    }

    /// Check settings that depend on each other.
    ///
    /// The request timeout must exceed the agent timeout so a charged agent
    /// call always finishes inside the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_seconds <= self.agent_timeout_seconds {
            return Err(format!(
                "REQUEST_TIMEOUT_SECONDS ({}) must exceed AGENT_TIMEOUT_SECONDS ({})",
                self.request_timeout_seconds, self.agent_timeout_seconds
            ));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Load Stripe secrets from file or environment.
fn load_stripe_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/stripe.json",
        "thryve/.secrets/stripe.json",
        "../.secrets/stripe.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            tracing::info!(path = %path, "Loaded Stripe secrets from file");
            return (Some(secrets.api_key), secrets.webhook_secret);
        }
    }

    tracing::debug!("Stripe secrets file not found, using environment variables");
    (
        std::env::var("STRIPE_API_KEY").ok(),
        std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            auth_base_url: "https://auth.thryve.app".into(),
            auth_issuer: None,
            auth_jwks_url: None,
            auth_audience: "thryve".into(),
            admin_api_key: None,
            content_agent_url: None,
            analysis_agent_url: None,
            agent_callback_url: String::new(),
            agent_timeout_seconds: 120,
            agent_webhook_secret: None,
            refund_policy: RefundPolicy::default(),
            signup_credits: 50,
            credit_costs: CreditCosts::default(),
            stripe_api_key: None,
            stripe_webhook_secret: None,
            stripe_api_base: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 150,
        }
    }
}
