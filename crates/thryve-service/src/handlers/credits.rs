//! Credit balance and transaction handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use thryve_core::{CostEntry, CreditTransaction, Operation, TransactionId, TransactionType, UserId};
use thryve_store::{CreditGrant, Store};

use crate::auth::{AdminAuth, AuthUser};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current balance in credits.
    pub credits: i64,
}

/// Get current credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let user = state
        .store
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(BalanceResponse {
        credits: user.credits,
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: TransactionId,
    /// Signed amount (positive = credit, negative = debit).
    pub amount: i64,
    /// Transaction type.
    pub transaction_type: TransactionType,
    /// Balance after this transaction.
    pub balance_after: i64,
    /// Operation charged or refunded.
    pub operation: Option<Operation>,
    /// Description.
    pub description: String,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount,
            transaction_type: tx.transaction_type,
            balance_after: tx.balance_after,
            operation: tx.operation,
            description: tx.description.clone(),
            created_at: tx.created_at,
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    state
        .store
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let transactions = state
        .store
        .list_transactions(&auth.user_id, limit + 1, query.offset)
        .await?;

    let has_more = transactions.len() > limit;
    let transactions: Vec<_> = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Cost table response.
#[derive(Debug, Serialize)]
pub struct CostsResponse {
    /// One entry per metered operation.
    pub costs: Vec<CostEntry>,
}

/// List the cost of every metered operation.
pub async fn list_costs(State(state): State<Arc<AppState>>) -> Json<CostsResponse> {
    Json(CostsResponse {
        costs: state.ledger.costs().entries(),
    })
}

/// Admin add credits request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAddCreditsRequest {
    /// User to credit.
    pub user_id: String,
    /// Positive number of credits.
    pub amount: i64,
    /// Reason for the credit.
    pub reason: String,
    /// Optional idempotency reference.
    #[serde(default)]
    pub reference: Option<String>,
}

/// Admin add credits response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAddCreditsResponse {
    /// Whether this call changed the balance.
    pub credited: bool,
    /// Balance after the grant, when applied.
    pub balance: Option<i64>,
    /// Ledger entry, when applied.
    pub transaction_id: Option<TransactionId>,
}

/// Admin endpoint to add bonus credits.
pub async fn admin_add_credits(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    ApiJson(body): ApiJson<AdminAddCreditsRequest>,
) -> Result<Json<AdminAddCreditsResponse>, ApiError> {
    let user_id =
        UserId::new(body.user_id).map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    if body.amount <= 0 {
        return Err(ApiError::BadRequest("amount must be positive".into()));
    }

    let grant = CreditGrant {
        user_id: user_id.clone(),
        amount: body.amount,
        transaction_type: TransactionType::Bonus,
        operation: None,
        reference: body.reference,
        description: body.reason,
    };

    let applied = state.ledger.grant(&grant).await?;

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %user_id,
        amount = body.amount,
        applied = applied.is_some(),
        "Admin credit grant"
    );

    Ok(Json(AdminAddCreditsResponse {
        credited: applied.is_some(),
        balance: applied.as_ref().map(|tx| tx.balance_after),
        transaction_id: applied.map(|tx| tx.id),
    }))
}
