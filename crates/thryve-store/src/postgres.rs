//! PostgreSQL storage implementation.
//!
//! Queries are built at runtime; rows are decoded by hand so the crate builds
//! without a live database.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{PgConnection, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use thryve_core::{
    Channel, ChannelId, CreditTransaction, IdeaId, JobId, JobRecord, JobStatus, Operation,
    SimilarChannel, TransactionId, User, UserId, VideoIdea,
};

use crate::error::{Result, StoreError};
use crate::schema::{all_tables, MIGRATOR};
use crate::{CreditGrant, DebitOutcome, JobCompletion, JobQuery, Store};

/// Default maximum number of connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Time to wait for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

const USER_COLUMNS: &str = "id, name, email, image_url, credits, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, amount, transaction_type, balance_after, \
     operation, reference, description, created_at";

const CHANNEL_COLUMNS: &str = "channel_id, user_id, title, description, thumbnail_url, \
     subscriber_count, video_count, view_count, created_at, updated_at";

const SIMILAR_COLUMNS: &str = "owner_channel_id, similar_channel_id, rank, relevance_score, \
     reasoning, created_at, updated_at";

const JOB_COLUMNS: &str = "id, generator_id, kind, user_id, channel_id, status, url, title, \
     description, asset_type, parent_id, video_idea_id, created_at, updated_at";

const IDEA_COLUMNS: &str =
    "id, user_id, channel_id, title, description, plan, seo, created_at, updated_at";

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be established.
    pub async fn connect(database_url: &str, config: &PoolConfig) -> Result<Self> {
        let start = Instant::now();
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await?;

        info!(
            max_connections = config.max_connections,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Delete every row. Intended for disposable test databases.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn truncate_all(&self) -> Result<()> {
        let sql = format!("TRUNCATE {} CASCADE", all_tables().join(", "));
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_transaction(conn: &mut PgConnection, tx: &CreditTransaction) -> Result<()> {
        sqlx::query(
            "INSERT INTO credit_transactions (id, user_id, amount, transaction_type, \
             balance_after, operation, reference, description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(tx.id.to_string())
        .bind(tx.user_id.as_str())
        .bind(tx.amount)
        .bind(tx.transaction_type.as_str())
        .bind(tx.balance_after)
        .bind(tx.operation.map(|op| op.key()))
        .bind(tx.reference.as_deref())
        .bind(&tx.description)
        .bind(tx.created_at)
        .execute(conn)
        .await
        .map_err(|e| match &tx.reference {
            Some(reference) if is_unique_violation(&e) => StoreError::DuplicateReference {
                reference: reference.clone(),
            },
            _ => e.into(),
        })?;
        Ok(())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// SQLSTATE 22003, `numeric_value_out_of_range`.
fn is_out_of_range(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("22003"))
}

// =============================================================================
// Row decoding
// =============================================================================

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: UserId::new(row.get::<String, _>("id"))?,
        name: row.get("name"),
        email: row.get("email"),
        image_url: row.get("image_url"),
        credits: row.get("credits"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn transaction_from_row(row: &PgRow) -> Result<CreditTransaction> {
    let id: String = row.get("id");
    let operation: Option<String> = row.get("operation");
    Ok(CreditTransaction {
        id: id.parse::<TransactionId>()?,
        user_id: UserId::new(row.get::<String, _>("user_id"))?,
        amount: row.get("amount"),
        transaction_type: row.get::<String, _>("transaction_type").parse()?,
        balance_after: row.get("balance_after"),
        operation: operation.map(|op| op.parse::<Operation>()).transpose()?,
        reference: row.get("reference"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    })
}

fn channel_from_row(row: &PgRow) -> Result<Channel> {
    Ok(Channel {
        channel_id: ChannelId::new(row.get::<String, _>("channel_id"))?,
        user_id: UserId::new(row.get::<String, _>("user_id"))?,
        title: row.get("title"),
        description: row.get("description"),
        thumbnail_url: row.get("thumbnail_url"),
        subscriber_count: row.get("subscriber_count"),
        video_count: row.get("video_count"),
        view_count: row.get("view_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn similar_from_row(row: &PgRow) -> Result<SimilarChannel> {
    Ok(SimilarChannel {
        owner_channel_id: ChannelId::new(row.get::<String, _>("owner_channel_id"))?,
        similar_channel_id: ChannelId::new(row.get::<String, _>("similar_channel_id"))?,
        rank: row.get("rank"),
        relevance_score: row.get("relevance_score"),
        reasoning: row.get("reasoning"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn job_from_row(row: &PgRow) -> Result<JobRecord> {
    Ok(JobRecord {
        id: JobId::from_uuid(row.get("id")),
        generator_id: row.get("generator_id"),
        kind: row.get::<String, _>("kind").parse()?,
        user_id: UserId::new(row.get::<String, _>("user_id"))?,
        channel_id: ChannelId::new(row.get::<String, _>("channel_id"))?,
        status: row.get::<String, _>("status").parse()?,
        url: row.get("url"),
        title: row.get("title"),
        description: row.get("description"),
        asset_type: row.get("asset_type"),
        parent_id: row.get::<Option<Uuid>, _>("parent_id").map(JobId::from_uuid),
        video_idea_id: row
            .get::<Option<Uuid>, _>("video_idea_id")
            .map(IdeaId::from_uuid),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn idea_from_row(row: &PgRow) -> Result<VideoIdea> {
    Ok(VideoIdea {
        id: IdeaId::from_uuid(row.get("id")),
        user_id: UserId::new(row.get::<String, _>("user_id"))?,
        channel_id: ChannelId::new(row.get::<String, _>("channel_id"))?,
        title: row.get("title"),
        description: row.get("description"),
        plan: row.get("plan"),
        seo: row.get("seo"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, image_url, credits, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id.as_str())
        .bind(user.name.as_deref())
        .bind(user.email.as_deref())
        .bind(user.image_url.as_deref())
        .bind(user.credits)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict("user", &user.id)
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    // =========================================================================
    // Credit Operations
    // =========================================================================

    async fn debit_credits(
        &self,
        user_id: &UserId,
        operation: Operation,
        amount: i64,
    ) -> Result<DebitOutcome> {
        let mut tx = self.pool.begin().await?;

        let charged: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET credits = credits - $2, updated_at = NOW() \
             WHERE id = $1 AND credits >= $2 RETURNING credits",
        )
        .bind(user_id.as_str())
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(balance_after) = charged else {
            let balance: Option<i64> = sqlx::query_scalar("SELECT credits FROM users WHERE id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
            return match balance {
                Some(balance) => Ok(DebitOutcome::Insufficient { balance }),
                None => Err(StoreError::not_found("user", user_id)),
            };
        };

        let transaction =
            CreditTransaction::debit(user_id.clone(), operation, amount, balance_after);
        Self::insert_transaction(&mut tx, &transaction).await?;
        tx.commit().await?;

        Ok(DebitOutcome::Charged {
            balance_after,
            transaction,
        })
    }

    async fn add_credits(&self, grant: &CreditGrant) -> Result<CreditTransaction> {
        let mut tx = self.pool.begin().await?;

        let balance_after: i64 = sqlx::query_scalar(
            "UPDATE users SET credits = credits + $2, updated_at = NOW() \
             WHERE id = $1 RETURNING credits",
        )
        .bind(grant.user_id.as_str())
        .bind(grant.amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            if is_out_of_range(&e) {
                StoreError::BalanceOverflow {
                    user_id: grant.user_id.to_string(),
                }
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| StoreError::not_found("user", &grant.user_id))?;

        let transaction = grant.to_transaction(balance_after);
        // A duplicate reference aborts here and the increment is rolled back
        Self::insert_transaction(&mut tx, &transaction).await?;
        tx.commit().await?;
        Ok(transaction)
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM credit_transactions WHERE user_id = $1 \
             ORDER BY id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(transaction_from_row)
            .collect()
    }

    // =========================================================================
    // Channel Operations
    // =========================================================================

    async fn insert_channel(&self, channel: &Channel) -> Result<()> {
        sqlx::query(
            "INSERT INTO channels (channel_id, user_id, title, description, thumbnail_url, \
             subscriber_count, video_count, view_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(channel.channel_id.as_str())
        .bind(channel.user_id.as_str())
        .bind(&channel.title)
        .bind(channel.description.as_deref())
        .bind(channel.thumbnail_url.as_deref())
        .bind(channel.subscriber_count)
        .bind(channel.video_count)
        .bind(channel.view_count)
        .bind(channel.created_at)
        .bind(channel.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::conflict("channel", &channel.channel_id)
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn get_channel(
        &self,
        user_id: &UserId,
        channel_id: &ChannelId,
    ) -> Result<Option<Channel>> {
        let sql =
            format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE user_id = $1 AND channel_id = $2");
        sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(channel_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(channel_from_row)
            .transpose()
    }

    async fn list_channels(&self, user_id: &UserId) -> Result<Vec<Channel>> {
        let sql =
            format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE user_id = $1 ORDER BY created_at");
        sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(channel_from_row)
            .collect()
    }

    async fn upsert_similar_channels(&self, rows: &[SimilarChannel]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO similar_channels (owner_channel_id, similar_channel_id, rank, \
                 relevance_score, reasoning, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (owner_channel_id, similar_channel_id) DO UPDATE SET \
                 rank = EXCLUDED.rank, relevance_score = EXCLUDED.relevance_score, \
                 reasoning = EXCLUDED.reasoning, updated_at = EXCLUDED.updated_at",
            )
            .bind(row.owner_channel_id.as_str())
            .bind(row.similar_channel_id.as_str())
            .bind(row.rank)
            .bind(&row.relevance_score)
            .bind(row.reasoning.as_deref())
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len())
    }

    async fn list_similar_channels(&self, owner: &ChannelId) -> Result<Vec<SimilarChannel>> {
        let sql = format!(
            "SELECT {SIMILAR_COLUMNS} FROM similar_channels WHERE owner_channel_id = $1 \
             ORDER BY rank, similar_channel_id"
        );
        sqlx::query(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(similar_from_row)
            .collect()
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    async fn insert_jobs(&self, jobs: &[JobRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for job in jobs {
            sqlx::query(
                "INSERT INTO jobs (id, generator_id, kind, user_id, channel_id, status, url, \
                 title, description, asset_type, parent_id, video_idea_id, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            )
            .bind(*job.id.as_uuid())
            .bind(&job.generator_id)
            .bind(job.kind.as_str())
            .bind(job.user_id.as_str())
            .bind(job.channel_id.as_str())
            .bind(job.status.as_str())
            .bind(job.url.as_deref())
            .bind(job.title.as_deref())
            .bind(job.description.as_deref())
            .bind(job.asset_type.as_deref())
            .bind(job.parent_id.map(|id| *id.as_uuid()))
            .bind(job.video_idea_id.map(|id| *id.as_uuid()))
            .bind(job.created_at)
            .bind(job.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::conflict("job", &job.generator_id)
                } else {
                    e.into()
                }
            })?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query(&sql)
            .bind(*job_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(job_from_row)
            .transpose()
    }

    async fn find_job_by_generator_id(&self, generator_id: &str) -> Result<Option<JobRecord>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE generator_id = $1");
        sqlx::query(&sql)
            .bind(generator_id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(job_from_row)
            .transpose()
    }

    async fn complete_job(
        &self,
        generator_id: &str,
        status: JobStatus,
        url: Option<&str>,
    ) -> Result<JobCompletion> {
        let sql = format!(
            "UPDATE jobs SET status = $2, url = COALESCE($3, url), updated_at = NOW() \
             WHERE generator_id = $1 AND status = 'PROCESSING' RETURNING {JOB_COLUMNS}"
        );
        let updated = sqlx::query(&sql)
            .bind(generator_id)
            .bind(status.as_str())
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = updated {
            return Ok(JobCompletion::Applied(job_from_row(&row)?));
        }

        Ok(match self.find_job_by_generator_id(generator_id).await? {
            Some(existing) => JobCompletion::AlreadyTerminal(existing),
            None => JobCompletion::NotFound,
        })
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM jobs WHERE user_id = "));
        qb.push_bind(query.user_id.as_str().to_owned());
        if let Some(channel_id) = &query.channel_id {
            qb.push(" AND channel_id = ")
                .push_bind(channel_id.as_str().to_owned());
        }
        if let Some(kind) = query.kind {
            qb.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(status) = query.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(asset_type) = &query.asset_type {
            qb.push(" AND asset_type = ").push_bind(asset_type.clone());
        }
        qb.push(if query.oldest_first {
            " ORDER BY created_at ASC"
        } else {
            " ORDER BY created_at DESC"
        });
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        qb.build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(job_from_row)
            .collect()
    }

    // =========================================================================
    // Idea Operations
    // =========================================================================

    async fn insert_idea(&self, idea: &VideoIdea) -> Result<()> {
        sqlx::query(
            "INSERT INTO video_ideas (id, user_id, channel_id, title, description, plan, seo, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(*idea.id.as_uuid())
        .bind(idea.user_id.as_str())
        .bind(idea.channel_id.as_str())
        .bind(&idea.title)
        .bind(idea.description.as_deref())
        .bind(&idea.plan)
        .bind(&idea.seo)
        .bind(idea.created_at)
        .bind(idea.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_idea(&self, idea_id: &IdeaId) -> Result<Option<VideoIdea>> {
        let sql = format!("SELECT {IDEA_COLUMNS} FROM video_ideas WHERE id = $1");
        sqlx::query(&sql)
            .bind(*idea_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(idea_from_row)
            .transpose()
    }

    async fn list_ideas(
        &self,
        user_id: &UserId,
        channel_id: &ChannelId,
    ) -> Result<Vec<VideoIdea>> {
        let sql = format!(
            "SELECT {IDEA_COLUMNS} FROM video_ideas WHERE user_id = $1 AND channel_id = $2 \
             ORDER BY created_at DESC"
        );
        sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(channel_id.as_str())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(idea_from_row)
            .collect()
    }

    async fn set_idea_plan(
        &self,
        idea_id: &IdeaId,
        plan: &serde_json::Value,
    ) -> Result<VideoIdea> {
        let sql = format!(
            "UPDATE video_ideas SET plan = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {IDEA_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*idea_id.as_uuid())
            .bind(plan)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("video idea", idea_id))?;
        idea_from_row(&row)
    }

    async fn set_idea_seo(&self, idea_id: &IdeaId, seo: &serde_json::Value) -> Result<VideoIdea> {
        let sql = format!(
            "UPDATE video_ideas SET seo = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {IDEA_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*idea_id.as_uuid())
            .bind(seo)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("video idea", idea_id))?;
        idea_from_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thryve_core::JobKind;

    async fn test_store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgStore::connect(&url, &PoolConfig::default()).await.unwrap();
        store.migrate().await.unwrap();
        store.truncate_all().await.unwrap();
        store
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn conditional_debit() {
        let store = test_store().await;
        store.create_user(&User::new(alice(), 25)).await.unwrap();

        let first = store
            .debit_credits(&alice(), Operation::ReelGenerate, 20)
            .await
            .unwrap();
        assert!(matches!(first, DebitOutcome::Charged { balance_after: 5, .. }));

        let second = store
            .debit_credits(&alice(), Operation::ReelGenerate, 20)
            .await
            .unwrap();
        assert_eq!(second, DebitOutcome::Insufficient { balance: 5 });

        let history = store.list_transactions(&alice(), 10, 0).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn duplicate_reference_rolls_back() {
        let store = test_store().await;
        store.create_user(&User::new(alice(), 0)).await.unwrap();
        let grant = CreditGrant {
            user_id: alice(),
            amount: 100,
            transaction_type: thryve_core::TransactionType::Purchase,
            operation: None,
            reference: Some("pi_1".into()),
            description: "pack_100".into(),
        };

        store.add_credits(&grant).await.unwrap();
        let again = store.add_credits(&grant).await;
        assert!(matches!(again, Err(StoreError::DuplicateReference { .. })));

        let user = store.get_user(&alice()).await.unwrap().unwrap();
        assert_eq!(user.credits, 100);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn overflowing_grant_is_rejected() {
        let store = test_store().await;
        store.create_user(&User::new(alice(), 50)).await.unwrap();
        let grant = CreditGrant {
            user_id: alice(),
            amount: i64::MAX,
            transaction_type: thryve_core::TransactionType::Bonus,
            operation: None,
            reference: None,
            description: "admin".into(),
        };

        let result = store.add_credits(&grant).await;
        assert!(matches!(result, Err(StoreError::BalanceOverflow { .. })));

        let user = store.get_user(&alice()).await.unwrap().unwrap();
        assert_eq!(user.credits, 50);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn job_completion_is_at_most_once() {
        let store = test_store().await;
        store.create_user(&User::new(alice(), 0)).await.unwrap();
        let channel = ChannelId::new("UC1").unwrap();
        store
            .insert_job(&JobRecord::processing(JobKind::Thumbnail, "t1", alice(), channel))
            .await
            .unwrap();

        let applied = store
            .complete_job("t1", JobStatus::Completed, Some("https://x/t.png"))
            .await
            .unwrap();
        assert!(matches!(applied, JobCompletion::Applied(_)));

        let again = store
            .complete_job("t1", JobStatus::Failed, None)
            .await
            .unwrap();
        let JobCompletion::AlreadyTerminal(stored) = again else {
            panic!("expected already terminal");
        };
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.url.as_deref(), Some("https://x/t.png"));
    }
}
