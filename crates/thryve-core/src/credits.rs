//! Credit transaction types for Thryve.
//!
//! Every change to a user's balance is recorded as a [`CreditTransaction`].
//! Transactions use ULIDs so the ledger sorts by creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Operation, TransactionId, UserId};

/// A credit transaction representing a balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Signed amount. Positive = credit, negative = debit.
    pub amount: i64,

    /// Type of transaction.
    pub transaction_type: TransactionType,

    /// Balance after this transaction.
    pub balance_after: i64,

    /// Metered operation, for debits and their refunds.
    pub operation: Option<Operation>,

    /// External reference (e.g. a payment intent id). Unique when present.
    pub reference: Option<String>,

    /// Human-readable description.
    pub description: String,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    fn new(
        user_id: UserId,
        amount: i64,
        transaction_type: TransactionType,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            amount,
            transaction_type,
            balance_after,
            operation: None,
            reference: None,
            description,
            created_at: Utc::now(),
        }
    }

    /// Create a debit for a metered operation.
    #[must_use]
    pub fn debit(user_id: UserId, operation: Operation, amount: i64, balance_after: i64) -> Self {
        let mut tx = Self::new(
            user_id,
            -amount.abs(), // Always negative for debits
            TransactionType::Debit,
            balance_after,
            operation.description().to_string(),
        );
        tx.operation = Some(operation);
        tx
    }

    /// Create a compensating refund for a failed operation.
    #[must_use]
    pub fn refund(
        user_id: UserId,
        operation: Option<Operation>,
        amount: i64,
        balance_after: i64,
        reason: String,
    ) -> Self {
        let mut tx = Self::new(
            user_id,
            amount.abs(),
            TransactionType::Refund,
            balance_after,
            reason,
        );
        tx.operation = operation;
        tx
    }

    /// Create a purchase transaction.
    #[must_use]
    pub fn purchase(
        user_id: UserId,
        amount: i64,
        balance_after: i64,
        description: String,
        reference: Option<String>,
    ) -> Self {
        let mut tx = Self::new(
            user_id,
            amount,
            TransactionType::Purchase,
            balance_after,
            description,
        );
        tx.reference = reference;
        tx
    }

    /// Create a bonus transaction.
    #[must_use]
    pub fn bonus(user_id: UserId, amount: i64, balance_after: i64, reason: String) -> Self {
        Self::new(user_id, amount, TransactionType::Bonus, balance_after, reason)
    }
}

/// Type of credit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Credits deducted for a metered operation.
    Debit,

    /// Credits returned after a failed operation.
    Refund,

    /// User purchased credits.
    Purchase,

    /// Promotional/bonus credits (signup grant, admin grant).
    Bonus,
}

impl TransactionType {
    /// Check if this transaction type adds credits.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::Refund | Self::Purchase | Self::Bonus)
    }

    /// Check if this transaction type removes credits.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Debit)
    }

    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Refund => "refund",
            Self::Purchase => "purchase",
            Self::Bonus => "bonus",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = crate::ThryveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(Self::Debit),
            "refund" => Ok(Self::Refund),
            "purchase" => Ok(Self::Purchase),
            "bonus" => Ok(Self::Bonus),
            other => Err(crate::ThryveError::InvalidValue(format!(
                "unknown transaction type: {other}"
            ))),
        }
    }
}

/// A purchasable bundle of credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPack {
    /// Pack identifier used by clients.
    pub id: &'static str,

    /// Credits granted.
    pub credits: i64,

    /// Price in US cents.
    pub price_cents: i64,
}

/// Credit packs on sale.
pub const CREDIT_PACKS: [CreditPack; 3] = [
    CreditPack {
        id: "pack_100",
        credits: 100,
        price_cents: 500,
    },
    CreditPack {
        id: "pack_500",
        credits: 500,
        price_cents: 2000,
    },
    CreditPack {
        id: "pack_1200",
        credits: 1200,
        price_cents: 4500,
    },
];

impl CreditPack {
    /// Look up a pack by id.
    #[must_use]
    pub fn find(id: &str) -> Option<Self> {
        CREDIT_PACKS.iter().copied().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user_test").unwrap()
    }

    #[test]
    fn debit_is_negative_and_tagged() {
        let tx = CreditTransaction::debit(user(), Operation::ReelGenerate, 20, 30);

        assert_eq!(tx.amount, -20);
        assert_eq!(tx.balance_after, 30);
        assert_eq!(tx.transaction_type, TransactionType::Debit);
        assert_eq!(tx.operation, Some(Operation::ReelGenerate));
    }

    #[test]
    fn purchase_keeps_reference() {
        let tx = CreditTransaction::purchase(user(), 500, 550, "pack_500".into(), Some("pi_1".into()));
        assert_eq!(tx.amount, 500);
        assert_eq!(tx.reference.as_deref(), Some("pi_1"));
    }

    #[test]
    fn transaction_type_is_credit_debit() {
        assert!(TransactionType::Purchase.is_credit());
        assert!(TransactionType::Refund.is_credit());
        assert!(TransactionType::Bonus.is_credit());
        assert!(!TransactionType::Debit.is_credit());
        assert!(TransactionType::Debit.is_debit());
        assert_eq!("refund".parse::<TransactionType>().unwrap(), TransactionType::Refund);
    }

    #[test]
    fn pack_lookup() {
        let pack = CreditPack::find("pack_1200").unwrap();
        assert_eq!(pack.credits, 1200);
        assert_eq!(pack.price_cents, 4500);
        assert!(CreditPack::find("pack_9").is_none());
    }
}
