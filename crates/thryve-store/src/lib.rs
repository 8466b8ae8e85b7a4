//! Ledger store for Thryve.
//!
//! This crate provides persistent storage for users and their credit balance,
//! the credit transaction ledger, channels, competitor associations, video
//! ideas and job records.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`, with embedded migrations.
//! - [`MemoryStore`]: in-process maps behind a `tokio` lock, for tests and
//!   local development.
//!
//! # Guarantees
//!
//! - A balance never goes below zero. Debits are a single conditional update
//!   that either charges the full amount or changes nothing.
//! - A credit grant carrying an external reference is applied at most once.
//! - A job record leaves `PROCESSING` at most once.
//!
//! # Example
//!
//! ```no_run
//! use thryve_core::{Operation, User, UserId};
//! use thryve_store::{DebitOutcome, MemoryStore, Store};
//!
//! # async fn demo() -> thryve_store::Result<()> {
//! let store = MemoryStore::new();
//! let user_id = UserId::new("user_1").unwrap();
//! store.create_user(&User::new(user_id.clone(), 50)).await?;
//!
//! match store.debit_credits(&user_id, Operation::ReelGenerate, 20).await? {
//!     DebitOutcome::Charged { balance_after, .. } => assert_eq!(balance_after, 30),
//!     DebitOutcome::Insufficient { .. } => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::{PgStore, PoolConfig};

use async_trait::async_trait;
use thryve_core::{
    Channel, ChannelId, CreditTransaction, IdeaId, JobId, JobKind, JobRecord, JobStatus,
    Operation, SimilarChannel, TransactionType, User, UserId, VideoIdea,
};

/// Result of a conditional debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The full amount was charged.
    Charged {
        /// Balance after the charge.
        balance_after: i64,
        /// The recorded ledger entry.
        transaction: CreditTransaction,
    },
    /// The balance was too low; nothing changed.
    Insufficient {
        /// Current balance.
        balance: i64,
    },
}

/// A balance increment and the ledger entry describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditGrant {
    /// User to credit.
    pub user_id: UserId,
    /// Positive amount.
    pub amount: i64,
    /// Refund, purchase or bonus.
    pub transaction_type: TransactionType,
    /// Operation being refunded, if any.
    pub operation: Option<Operation>,
    /// Unique external reference, if any.
    pub reference: Option<String>,
    /// Human-readable description.
    pub description: String,
}

impl CreditGrant {
    /// Build the ledger entry for this grant at the given resulting balance.
    #[must_use]
    pub fn to_transaction(&self, balance_after: i64) -> CreditTransaction {
        let mut tx = match self.transaction_type {
            TransactionType::Refund => CreditTransaction::refund(
                self.user_id.clone(),
                self.operation,
                self.amount,
                balance_after,
                self.description.clone(),
            ),
            TransactionType::Purchase => CreditTransaction::purchase(
                self.user_id.clone(),
                self.amount,
                balance_after,
                self.description.clone(),
                None,
            ),
            TransactionType::Bonus | TransactionType::Debit => CreditTransaction::bonus(
                self.user_id.clone(),
                self.amount,
                balance_after,
                self.description.clone(),
            ),
        };
        tx.reference.clone_from(&self.reference);
        tx
    }
}

/// Result of applying an agent completion to a job record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobCompletion {
    /// The record moved from `PROCESSING` to a terminal state.
    Applied(JobRecord),
    /// The record was already terminal; nothing was written.
    AlreadyTerminal(JobRecord),
    /// No record carries this generator id.
    NotFound,
}

/// Filter for listing job records.
///
/// Results are always restricted to one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    /// Owning user.
    pub user_id: UserId,
    /// Restrict to one channel.
    pub channel_id: Option<ChannelId>,
    /// Restrict to one kind.
    pub kind: Option<JobKind>,
    /// Restrict to one status.
    pub status: Option<JobStatus>,
    /// Restrict to one asset type.
    pub asset_type: Option<String>,
    /// Oldest first instead of newest first.
    pub oldest_first: bool,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl JobQuery {
    /// All jobs of a user, newest first.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            channel_id: None,
            kind: None,
            status: None,
            asset_type: None,
            oldest_first: false,
            limit: None,
        }
    }

    /// Restrict to one channel.
    #[must_use]
    pub fn channel(mut self, channel_id: Option<ChannelId>) -> Self {
        self.channel_id = channel_id;
        self
    }

    /// Restrict to one kind.
    #[must_use]
    pub fn kind(mut self, kind: JobKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to one status.
    #[must_use]
    pub fn status(mut self, status: Option<JobStatus>) -> Self {
        self.status = status;
        self
    }

    /// Restrict to one asset type.
    #[must_use]
    pub fn asset_type(mut self, asset_type: impl Into<String>) -> Self {
        self.asset_type = Some(asset_type.into());
        self
    }

    /// Order oldest first.
    #[must_use]
    pub fn oldest_first(mut self) -> Self {
        self.oldest_first = true;
        self
    }

    /// Whether a record passes this filter.
    #[must_use]
    pub fn matches(&self, job: &JobRecord) -> bool {
        job.user_id == self.user_id
            && self.channel_id.as_ref().map_or(true, |c| &job.channel_id == c)
            && self.kind.map_or(true, |k| job.kind == k)
            && self.status.map_or(true, |s| job.status == s)
            && self
                .asset_type
                .as_deref()
                .map_or(true, |t| job.asset_type.as_deref() == Some(t))
    }
}

/// The storage trait defining all database operations.
///
/// Implementations must make each method atomic. Shared as
/// `Arc<dyn Store>`.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the user already exists.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    // =========================================================================
    // Credit Operations
    // =========================================================================

    /// Charge `amount` credits if the balance covers it, recording a debit.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn debit_credits(
        &self,
        user_id: &UserId,
        operation: Operation,
        amount: i64,
    ) -> Result<DebitOutcome>;

    /// Add credits and record the grant atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::DuplicateReference` if the grant's reference was
    ///   already applied. Nothing changes in that case.
    async fn add_credits(&self, grant: &CreditGrant) -> Result<CreditTransaction>;

    /// List transactions for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    // =========================================================================
    // Channel Operations
    // =========================================================================

    /// Register a channel for a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the user already registered it.
    async fn insert_channel(&self, channel: &Channel) -> Result<()>;

    /// Get a channel registered by a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_channel(&self, user_id: &UserId, channel_id: &ChannelId)
        -> Result<Option<Channel>>;

    /// List a user's channels, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_channels(&self, user_id: &UserId) -> Result<Vec<Channel>>;

    /// Insert or update competitor associations in one transaction.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is written.
    async fn upsert_similar_channels(&self, rows: &[SimilarChannel]) -> Result<usize>;

    /// List competitor associations of a channel, ordered by rank.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_similar_channels(&self, owner: &ChannelId) -> Result<Vec<SimilarChannel>>;

    // =========================================================================
    // Job Operations
    // =========================================================================

    /// Insert a job record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the generator id is taken.
    async fn insert_job(&self, job: &JobRecord) -> Result<()> {
        self.insert_jobs(std::slice::from_ref(job)).await
    }

    /// Insert several job records atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if any generator id is taken; nothing
    /// is written.
    async fn insert_jobs(&self, jobs: &[JobRecord]) -> Result<()>;

    /// Get a job record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobRecord>>;

    /// Find the job record carrying a generator id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_job_by_generator_id(&self, generator_id: &str) -> Result<Option<JobRecord>>;

    /// Move a `PROCESSING` record to a terminal status.
    ///
    /// `url`, when present, replaces the stored URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn complete_job(
        &self,
        generator_id: &str,
        status: JobStatus,
        url: Option<&str>,
    ) -> Result<JobCompletion>;

    /// List job records matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>>;

    // =========================================================================
    // Idea Operations
    // =========================================================================

    /// Insert a video idea.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_idea(&self, idea: &VideoIdea) -> Result<()>;

    /// Get a video idea by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_idea(&self, idea_id: &IdeaId) -> Result<Option<VideoIdea>>;

    /// List a user's ideas for a channel, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_ideas(&self, user_id: &UserId, channel_id: &ChannelId)
        -> Result<Vec<VideoIdea>>;

    /// Store the production plan of an idea.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the idea doesn't exist.
    async fn set_idea_plan(&self, idea_id: &IdeaId, plan: &serde_json::Value)
        -> Result<VideoIdea>;

    /// Store the SEO data of an idea.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the idea doesn't exist.
    async fn set_idea_seo(&self, idea_id: &IdeaId, seo: &serde_json::Value) -> Result<VideoIdea>;
}
