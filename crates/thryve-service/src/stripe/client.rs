//! Stripe API client implementation.

use reqwest::Client;
use std::time::Duration;

use thryve_core::{CreditPack, UserId};

use super::types::{PaymentIntent, StripeErrorResponse};
use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Invalid webhook signature.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    webhook_secret: Option<String>,
    base_url: String,
}

impl StripeClient {
    /// Stripe API base URL.
    const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Create a new Stripe client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    /// * `webhook_secret` - Optional webhook signing secret (whsec_...)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Result<Self, StripeError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            webhook_secret,
            base_url: Self::BASE_URL.to_string(),
        })
    }

    /// Point the client at another API host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create a `PaymentIntent` for a credit pack.
    ///
    /// The buyer and pack are stored in the intent metadata and read back
    /// when the payment is credited.
    pub async fn create_payment_intent(
        &self,
        user_id: &UserId,
        pack: &CreditPack,
    ) -> Result<PaymentIntent, StripeError> {
        let params = [
            ("amount", pack.price_cents.to_string()),
            ("currency", "usd".to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("description", format!("{} Thryve credits", pack.credits)),
            ("metadata[user_id]", user_id.to_string()),
            ("metadata[pack_id]", pack.id.to_string()),
            ("metadata[credits]", pack.credits.to_string()),
        ];

        tracing::debug!(
            user_id = %user_id,
            pack_id = %pack.id,
            amount_cents = %pack.price_cents,
            "Creating Stripe payment intent"
        );

        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a single payment intent by ID.
    pub async fn get_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, StripeError> {
        let response = self
            .client
            .get(format!(
                "{}/payment_intents/{}",
                self.base_url, payment_intent_id
            ))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Verify a webhook signature.
    ///
    /// # Arguments
    ///
    /// * `payload` - Raw request body
    /// * `signature` - Value of the `Stripe-Signature` header
    pub fn verify_webhook_signature(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<(), StripeError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or_else(|| StripeError::Configuration("Webhook secret not configured".into()))?;

        // Format: t=timestamp,v1=signature,v1=signature2,...
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("t", ts)) => timestamp = Some(ts),
                Some(("v1", sig)) => signatures.push(sig),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;

        if signatures.is_empty() {
            return Err(StripeError::InvalidSignature);
        }

        let signed_payload = format!("{timestamp}.{payload}");
        let expected = hmac_sha256_hex(secret, signed_payload.as_bytes());

        if signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
            Ok(())
        } else {
            Err(StripeError::InvalidSignature)
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(secret: &str, ts: &str, payload: &str) -> String {
        format!(
            "t={ts},v1={}",
            hmac_sha256_hex(secret, format!("{ts}.{payload}").as_bytes())
        )
    }

    #[test]
    fn client_with_webhook_secret() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_xxx".to_string())).unwrap();
        assert!(client.webhook_secret.is_some());
        assert_eq!(client.base_url, StripeClient::BASE_URL);
    }

    #[test]
    fn webhook_signature_roundtrip() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_abc".into())).unwrap();
        let payload = r#"{"id":"evt_1"}"#;
        let header = signed("whsec_abc", "1700000000", payload);
        assert!(client.verify_webhook_signature(payload, &header).is_ok());
        assert!(matches!(
            client.verify_webhook_signature(r#"{"id":"evt_2"}"#, &header),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn webhook_signature_requires_timestamp_and_secret() {
        let client = StripeClient::new("sk_test_xxx", Some("whsec_abc".into())).unwrap();
        assert!(matches!(
            client.verify_webhook_signature("{}", "v1=deadbeef"),
            Err(StripeError::InvalidSignature)
        ));

        let unsigned = StripeClient::new("sk_test_xxx", None).unwrap();
        assert!(matches!(
            unsigned.verify_webhook_signature("{}", "t=1,v1=00"),
            Err(StripeError::Configuration(_))
        ));
    }
}
