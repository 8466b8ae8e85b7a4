//! User provisioning handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thryve_core::{TransactionType, User, UserId};
use thryve_store::{CreditGrant, Store, StoreError};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Provisioning request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Email.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// User response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// User id.
    pub id: UserId,
    /// Display name.
    pub name: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Avatar URL.
    pub image_url: Option<String>,
    /// Credit balance.
    pub credits: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image_url: user.image_url,
            credits: user.credits,
            created_at: user.created_at,
        }
    }
}

/// Provision the caller with the signup grant.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Option<Json<CreateUserRequest>>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(body) = body.unwrap_or_default();

    let user = User::new(auth.user_id.clone(), 0).with_profile(body.name, body.email, body.image_url);

    match state.store.create_user(&user).await {
        Ok(()) => {}
        Err(StoreError::Conflict { .. }) => {
            return Err(ApiError::Conflict("User already exists".into()));
        }
        Err(e) => return Err(e.into()),
    }

    let signup_credits = state.config.signup_credits;
    if signup_credits > 0 {
        state
            .ledger
            .grant(&CreditGrant {
                user_id: auth.user_id.clone(),
                amount: signup_credits,
                transaction_type: TransactionType::Bonus,
                operation: None,
                reference: Some(format!("signup:{}", auth.user_id)),
                description: "Signup credits".into(),
            })
            .await?;
    }

    tracing::info!(user_id = %auth.user_id, signup_credits, "User provisioned");

    let user = state
        .store
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Internal("user vanished after creation".into()))?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get the caller's profile and balance.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserResponse::from(user)))
}
