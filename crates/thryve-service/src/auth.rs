//! Authentication extractors.
//!
//! - `AuthUser`: end-user bearer JWT (RS256), verified by [`JwksVerifier`]
//!   against the identity provider's published keys. The `sub` claim is the
//!   user id.
//! - `AdminAuth`: `X-Admin-Key` header for privileged endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use thryve_core::UserId;

use crate::config::ServiceConfig;
use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::state::AppState;

/// Keys older than this are refetched before use.
const JWKS_TTL: Duration = Duration::from_secs(3600);

/// A token naming an unknown `kid` triggers a refetch at most this often.
const JWKS_MIN_REFRESH: Duration = Duration::from_secs(30);

const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated user extracted from a bearer JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        // Only compiled for tests and the `test-auth` feature.
        #[cfg(any(test, feature = "test-auth"))]
        if let Some(user_id) = token.strip_prefix("test-token:") {
            let user_id = UserId::new(user_id).map_err(|_| ApiError::Unauthorized)?;
            return Ok(AuthUser { user_id });
        }

        let claims = state.auth.verify(token).await?;

        let user_id = UserId::new(claims.sub).map_err(|e| {
            tracing::debug!(error = %e, "JWT subject is not a valid user id");
            ApiError::Unauthorized
        })?;

        Ok(AuthUser { user_id })
    }
}

/// Admin authentication via the `X-Admin-Key` header.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier from `X-Admin-Id`, for audit logs.
    pub admin_id: String,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let admin_key = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .admin_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if !constant_time_eq(admin_key, expected_key) {
            return Err(ApiError::Unauthorized);
        }

        let admin_id = parts
            .headers
            .get("x-admin-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("admin")
            .to_string();

        tracing::info!(admin_id = %admin_id, "Admin authenticated");

        Ok(AdminAuth { admin_id })
    }
}

/// Claims read from a user token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject; the user id.
    pub sub: String,
    /// Audience, a string or an array.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Issuer.
    pub iss: String,
    /// Expiration time.
    pub exp: i64,
    /// Issued at.
    #[serde(default)]
    pub iat: Option<i64>,
}

// ============================================================================
// JWKS verification
// ============================================================================

/// Published key set.
#[derive(Debug, Clone, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

/// One published key. Only RSA signing keys are used.
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kty: String,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
    #[serde(default, rename = "use")]
    key_use: Option<String>,
}

impl Jwk {
    fn decoding_key(&self) -> Option<DecodingKey> {
        if self.kty != "RSA" {
            return None;
        }
        if self.key_use.as_deref().is_some_and(|u| u != "sig") {
            return None;
        }
        if self.alg.as_deref().is_some_and(|a| a != "RS256") {
            return None;
        }
        DecodingKey::from_rsa_components(self.n.as_ref()?, self.e.as_ref()?).ok()
    }
}

#[derive(Default)]
struct KeyCache {
    by_kid: HashMap<String, DecodingKey>,
    /// Serves tokens without a `kid` when the set holds exactly one key.
    sole_key: Option<DecodingKey>,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self.by_kid.get(kid).cloned(),
            None => self.sole_key.clone(),
        }
    }

    fn age(&self) -> Option<Duration> {
        self.fetched_at.map(|at| at.elapsed())
    }
}

/// Verifies user tokens against a JWKS endpoint, caching the keys.
///
/// Keys are refetched when older than an hour, or when a token names a
/// `kid` the cache does not hold (key rotation), at most every 30 seconds.
pub struct JwksVerifier {
    client: reqwest::Client,
    jwks_url: String,
    validation: Validation,
    min_refresh: Duration,
    cache: RwLock<KeyCache>,
}

impl std::fmt::Debug for JwksVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksVerifier")
            .field("jwks_url", &self.jwks_url)
            .finish_non_exhaustive()
    }
}

impl JwksVerifier {
    /// Verifier for tokens issued by `issuer` for `audience`.
    #[must_use]
    pub fn new(jwks_url: impl Into<String>, issuer: &str, audience: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Self {
            client,
            jwks_url: jwks_url.into(),
            validation,
            min_refresh: JWKS_MIN_REFRESH,
            cache: RwLock::new(KeyCache::default()),
        }
    }

    /// Verifier for the configured identity provider.
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.jwks_url(), config.auth_issuer(), &config.auth_audience)
    }

    /// Shortest interval between refetches caused by unknown key ids.
    #[must_use]
    pub fn with_min_refresh(mut self, interval: Duration) -> Self {
        self.min_refresh = interval;
        self
    }

    /// Verify a token's signature, issuer, audience and expiry.
    pub async fn verify(&self, token: &str) -> Result<JwtClaims, ApiError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode JWT header");
            ApiError::Unauthorized
        })?;
        if header.alg != Algorithm::RS256 {
            tracing::debug!(alg = ?header.alg, "Unsupported JWT algorithm");
            return Err(ApiError::Unauthorized);
        }

        let key = self.key_for(header.kid.as_deref()).await?;

        decode::<JwtClaims>(token, &key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                ApiError::Unauthorized
            })
    }

    async fn key_for(&self, kid: Option<&str>) -> Result<DecodingKey, ApiError> {
        {
            let cache = self.cache.read().await;
            match cache.age() {
                Some(age) if age < JWKS_TTL => {
                    if let Some(key) = cache.lookup(kid) {
                        return Ok(key);
                    }
                    if age < self.min_refresh {
                        tracing::debug!(kid = ?kid, "Unknown JWT key id");
                        return Err(ApiError::Unauthorized);
                    }
                }
                _ => {}
            }
        }

        let fresh = self.fetch().await?;
        let mut cache = self.cache.write().await;
        *cache = fresh;
        cache.lookup(kid).ok_or_else(|| {
            tracing::debug!(kid = ?kid, "JWT key id not in published key set");
            ApiError::Unauthorized
        })
    }

    async fn fetch(&self) -> Result<KeyCache, ApiError> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let unavailable = || ApiError::ExternalService("Failed to fetch authentication keys".into());

        let response = self.client.get(&self.jwks_url).send().await.map_err(|e| {
            tracing::error!(error = %e, url = %self.jwks_url, "Failed to fetch JWKS");
            unavailable()
        })?;

        if !response.status().is_success() {
            tracing::error!(
                status = %response.status(),
                url = %self.jwks_url,
                "JWKS fetch returned non-success status"
            );
            return Err(unavailable());
        }

        let jwks: Jwks = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS response");
            unavailable()
        })?;

        let usable: Vec<(Option<String>, DecodingKey)> = jwks
            .keys
            .iter()
            .filter_map(|jwk| Some((jwk.kid.clone(), jwk.decoding_key()?)))
            .collect();

        tracing::info!(keys = jwks.keys.len(), usable = usable.len(), "JWKS fetched");

        let sole_key = match usable.as_slice() {
            [(_, key)] => Some(key.clone()),
            _ => None,
        };
        let by_kid = usable
            .into_iter()
            .filter_map(|(kid, key)| Some((kid?, key)))
            .collect();

        Ok(KeyCache {
            by_kid,
            sole_key,
            fetched_at: Some(Instant::now()),
        })
    }
}
