//! Credit debit service.
//!
//! Wraps the store's conditional debit with the cost table, and owns the
//! compensating refund used when paid work never started.

use std::sync::Arc;
use std::time::Duration;

use thryve_core::{CreditCosts, CreditTransaction, Operation, TransactionId, TransactionType, UserId};
use thryve_store::{CreditGrant, DebitOutcome, Store, StoreError};

use crate::config::RefundPolicy;
use crate::error::ApiError;

/// Maximum attempts for a compensating refund.
const REFUND_MAX_RETRIES: u32 = 3;

/// Initial backoff between refund attempts.
const REFUND_INITIAL_BACKOFF_MS: u64 = 100;

/// Backoff cap between refund attempts.
const REFUND_MAX_BACKOFF_MS: u64 = 5000;

/// A successful charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debit {
    /// Charged user.
    pub user_id: UserId,
    /// Operation paid for.
    pub operation: Operation,
    /// Credits charged.
    pub amount: i64,
    /// Balance after the charge.
    pub balance_after: i64,
    /// Ledger entry of the charge.
    pub transaction_id: TransactionId,
}

/// Credit ledger over a store and a cost table.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn Store>,
    costs: CreditCosts,
    refund_policy: RefundPolicy,
}

impl CreditLedger {
    /// Create a new ledger.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, costs: CreditCosts, refund_policy: RefundPolicy) -> Self {
        Self {
            store,
            costs,
            refund_policy,
        }
    }

    /// The cost table.
    #[must_use]
    pub fn costs(&self) -> &CreditCosts {
        &self.costs
    }

    /// The refund policy in effect.
    #[must_use]
    pub fn refund_policy(&self) -> RefundPolicy {
        self.refund_policy
    }

    /// Charge the cost of `operation`, or fail without changing the balance.
    pub async fn try_debit(&self, user_id: &UserId, operation: Operation) -> Result<Debit, ApiError> {
        let amount = self.costs.cost(operation);

        let outcome = match self.store.debit_credits(user_id, operation, amount).await {
            Ok(outcome) => outcome,
            Err(StoreError::NotFound { .. }) => {
                return Err(ApiError::NotFound("User not found".into()));
            }
            Err(e) => return Err(e.into()),
        };

        match outcome {
            DebitOutcome::Charged {
                balance_after,
                transaction,
            } => {
                tracing::info!(
                    user_id = %user_id,
                    operation = %operation,
                    amount,
                    balance_after,
                    transaction_id = %transaction.id,
                    "Credits debited"
                );
                Ok(Debit {
                    user_id: user_id.clone(),
                    operation,
                    amount,
                    balance_after,
                    transaction_id: transaction.id,
                })
            }
            DebitOutcome::Insufficient { balance } => {
                tracing::info!(
                    user_id = %user_id,
                    operation = %operation,
                    balance,
                    required = amount,
                    "Insufficient credits"
                );
                Err(ApiError::InsufficientCredits {
                    balance,
                    required: amount,
                })
            }
        }
    }

    /// Refund a debit when the policy allows it.
    ///
    /// Never fails the caller: an exhausted refund is logged as an alert.
    pub async fn compensate(&self, debit: &Debit, reason: &str) {
        if !self.refund_policy.refunds_agent_failure() {
            tracing::info!(
                user_id = %debit.user_id,
                operation = %debit.operation,
                amount = debit.amount,
                reason,
                "Refund policy is never; keeping debit"
            );
            return;
        }

        // The error is already logged at alert level.
        let _ = self.refund(debit, reason).await;
    }

    /// Credit back a debit, retrying with exponential backoff.
    ///
    /// The refund is keyed by the debit's transaction id, so a retry after an
    /// ambiguous failure cannot pay twice.
    pub async fn refund(&self, debit: &Debit, reason: &str) -> Result<Option<CreditTransaction>, ApiError> {
        let grant = CreditGrant {
            user_id: debit.user_id.clone(),
            amount: debit.amount,
            transaction_type: TransactionType::Refund,
            operation: Some(debit.operation),
            reference: Some(format!("refund:{}", debit.transaction_id)),
            description: format!("Refund: {reason}"),
        };

        let mut attempt = 0;
        let mut backoff_ms = REFUND_INITIAL_BACKOFF_MS;

        loop {
            match self.store.add_credits(&grant).await {
                Ok(tx) => {
                    tracing::info!(
                        user_id = %debit.user_id,
                        operation = %debit.operation,
                        amount = debit.amount,
                        balance_after = tx.balance_after,
                        reason,
                        "Credits refunded"
                    );
                    return Ok(Some(tx));
                }
                Err(StoreError::DuplicateReference { .. }) => {
                    tracing::debug!(
                        debit_id = %debit.transaction_id,
                        "Refund already applied"
                    );
                    return Ok(None);
                }
                Err(e) => {
                    attempt += 1;

                    if attempt >= REFUND_MAX_RETRIES || !is_retryable(&e) {
                        tracing::error!(
                            alert = "refund_failed",
                            user_id = %debit.user_id,
                            operation = %debit.operation,
                            amount = debit.amount,
                            debit_id = %debit.transaction_id,
                            attempt,
                            error = %e,
                            "Refund failed; user is under-credited"
                        );
                        return Err(e.into());
                    }

                    tracing::warn!(
                        debit_id = %debit.transaction_id,
                        attempt,
                        backoff_ms,
                        error = %e,
                        "Refund failed, retrying"
                    );

                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms * 2).min(REFUND_MAX_BACKOFF_MS);
                }
            }
        }
    }

    /// Apply a positive grant.
    ///
    /// Returns `None` when the grant's reference was already applied.
    pub async fn grant(&self, grant: &CreditGrant) -> Result<Option<CreditTransaction>, ApiError> {
        match self.store.add_credits(grant).await {
            Ok(tx) => {
                tracing::info!(
                    user_id = %grant.user_id,
                    amount = grant.amount,
                    transaction_type = %grant.transaction_type.as_str(),
                    reference = ?grant.reference,
                    balance_after = tx.balance_after,
                    "Credits granted"
                );
                Ok(Some(tx))
            }
            Err(StoreError::DuplicateReference { reference }) => {
                tracing::info!(reference = %reference, "Grant already applied");
                Ok(None)
            }
            Err(StoreError::NotFound { .. }) => Err(ApiError::NotFound("User not found".into())),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_retryable(err: &StoreError) -> bool {
    matches!(err, StoreError::Database(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use thryve_core::User;
    use thryve_store::MemoryStore;

    async fn ledger(balance: i64, policy: RefundPolicy) -> (CreditLedger, Arc<MemoryStore>, UserId) {
        let store = Arc::new(MemoryStore::new());
        let user_id = UserId::new("alice").unwrap();
        store.create_user(&User::new(user_id.clone(), balance)).await.unwrap();
        let ledger = CreditLedger::new(store.clone(), CreditCosts::default(), policy);
        (ledger, store, user_id)
    }

    async fn balance(store: &MemoryStore, user_id: &UserId) -> i64 {
        store.get_user(user_id).await.unwrap().unwrap().credits
    }

    #[tokio::test]
    async fn debit_charges_operation_cost() {
        let (ledger, store, user) = ledger(50, RefundPolicy::default()).await;
        let debit = ledger.try_debit(&user, Operation::ReelGenerate).await.unwrap();
        assert_eq!(debit.amount, 20);
        assert_eq!(debit.balance_after, 30);
        assert_eq!(balance(&store, &user).await, 30);
    }

    #[tokio::test]
    async fn insufficient_leaves_balance() {
        let (ledger, store, user) = ledger(10, RefundPolicy::default()).await;
        let err = ledger.try_debit(&user, Operation::ReelGenerate).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::InsufficientCredits {
                balance: 10,
                required: 20
            }
        ));
        assert_eq!(balance(&store, &user).await, 10);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (ledger, _, _) = ledger(10, RefundPolicy::default()).await;
        let ghost = UserId::new("ghost").unwrap();
        let err = ledger.try_debit(&ghost, Operation::CtrPredict).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn refund_is_applied_once() {
        let (ledger, store, user) = ledger(50, RefundPolicy::OnAgentFailure).await;
        let debit = ledger.try_debit(&user, Operation::ThumbnailGenerate).await.unwrap();
        assert_eq!(balance(&store, &user).await, 35);

        assert!(ledger.refund(&debit, "agent down").await.unwrap().is_some());
        assert!(ledger.refund(&debit, "agent down").await.unwrap().is_none());
        assert_eq!(balance(&store, &user).await, 50);

        let history = store.list_transactions(&user, 10, 0).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].transaction_type, TransactionType::Refund);
        assert_eq!(history[0].operation, Some(Operation::ThumbnailGenerate));
    }

    #[tokio::test]
    async fn never_policy_keeps_debit() {
        let (ledger, store, user) = ledger(50, RefundPolicy::Never).await;
        let debit = ledger.try_debit(&user, Operation::AudioGenerate).await.unwrap();
        ledger.compensate(&debit, "agent down").await;
        assert_eq!(balance(&store, &user).await, 40);
    }

    #[tokio::test]
    async fn grant_with_reference_is_idempotent() {
        let (ledger, store, user) = ledger(0, RefundPolicy::default()).await;
        let grant = CreditGrant {
            user_id: user.clone(),
            amount: 100,
            transaction_type: TransactionType::Purchase,
            operation: None,
            reference: Some("pi_1".into()),
            description: "pack_100".into(),
        };
        assert!(ledger.grant(&grant).await.unwrap().is_some());
        assert!(ledger.grant(&grant).await.unwrap().is_none());
        assert_eq!(balance(&store, &user).await, 100);
    }
}
