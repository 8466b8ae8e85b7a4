//! Application state.

use std::sync::Arc;
use std::time::Duration;

use thryve_store::Store;

use crate::agent::{AgentClient, AgentError};
use crate::auth::JwksVerifier;
use crate::config::ServiceConfig;
use crate::ledger::CreditLedger;
use crate::stripe::StripeClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Credit debit service.
    pub ledger: CreditLedger,

    /// Content and analysis agents.
    pub agents: AgentClient,

    /// User token verification.
    pub auth: Arc<JwksVerifier>,

    /// Stripe client for payments (optional).
    pub stripe: Option<Arc<StripeClient>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent HTTP client cannot be built.
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Result<Self, AgentError> {
        let agents = AgentClient::new(
            config.content_agent_url.clone(),
            config.analysis_agent_url.clone(),
            config.agent_callback_url.clone(),
            Duration::from_secs(config.agent_timeout_seconds),
        )?;

        if config.content_agent_url.is_none() {
            tracing::warn!("Content agent not configured - voice, thumbnail and reel jobs will fail");
        }
        if config.analysis_agent_url.is_none() {
            tracing::warn!("Analysis agent not configured - discovery, CTR and critique will fail");
        }
        if config.agent_webhook_secret.is_none() {
            tracing::warn!("Agent webhook secret not configured - callbacks are not authenticated");
        }

        let stripe = config.stripe_api_key.as_ref().and_then(|key| {
            match StripeClient::new(key, config.stripe_webhook_secret.clone()) {
                Ok(client) => {
                    tracing::info!("Stripe integration enabled");
                    let client = match &config.stripe_api_base {
                        Some(base) => client.with_base_url(base),
                        None => client,
                    };
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create Stripe client");
                    None
                }
            }
        });

        if stripe.is_none() {
            tracing::warn!("Stripe not configured - credit purchases will not be available");
        }

        let ledger = CreditLedger::new(
            store.clone(),
            config.credit_costs.clone(),
            config.refund_policy,
        );

        tracing::info!(refund_policy = %config.refund_policy, "Credit ledger ready");

        let auth = Arc::new(JwksVerifier::from_config(&config));

        Ok(Self {
            store,
            config,
            ledger,
            agents,
            auth,
            stripe,
        })
    }
}
