//! In-memory storage implementation.
//!
//! All state lives behind one `tokio` `RwLock`, so each trait method is atomic
//! with respect to every other.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use thryve_core::{
    Channel, ChannelId, CreditTransaction, IdeaId, JobId, JobRecord, JobStatus, Operation,
    SimilarChannel, User, UserId, VideoIdea,
};

use crate::error::{Result, StoreError};
use crate::{CreditGrant, DebitOutcome, JobCompletion, JobQuery, Store};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    transactions: Vec<CreditTransaction>,
    references: HashSet<String>,
    channels: HashMap<(UserId, ChannelId), Channel>,
    similar: HashMap<(ChannelId, ChannelId), SimilarChannel>,
    jobs: HashMap<JobId, JobRecord>,
    generator_index: HashMap<String, JobId>,
    ideas: HashMap<IdeaId, VideoIdea>,
}

/// Map-backed storage implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, offset: usize, limit: usize) -> Vec<T> {
    items.skip(offset).take(limit).collect()
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.id) {
            return Err(StoreError::conflict("user", &user.id));
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
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
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;

        if user.credits < amount {
            return Ok(DebitOutcome::Insufficient {
                balance: user.credits,
            });
        }

        user.credits -= amount;
        user.updated_at = Utc::now();
        let balance_after = user.credits;

        let transaction =
            CreditTransaction::debit(user_id.clone(), operation, amount, balance_after);
        inner.transactions.push(transaction.clone());

        Ok(DebitOutcome::Charged {
            balance_after,
            transaction,
        })
    }

    async fn add_credits(&self, grant: &CreditGrant) -> Result<CreditTransaction> {
        let mut inner = self.inner.write().await;

        if let Some(reference) = &grant.reference {
            if inner.references.contains(reference) {
                return Err(StoreError::DuplicateReference {
                    reference: reference.clone(),
                });
            }
        }

        let user = inner
            .users
            .get_mut(&grant.user_id)
            .ok_or_else(|| StoreError::not_found("user", &grant.user_id))?;
        user.credits = user
            .credits
            .checked_add(grant.amount)
            .ok_or_else(|| StoreError::BalanceOverflow {
                user_id: grant.user_id.to_string(),
            })?;
        user.updated_at = Utc::now();

        let transaction = grant.to_transaction(user.credits);
        if let Some(reference) = &grant.reference {
            inner.references.insert(reference.clone());
        }
        inner.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let inner = self.inner.read().await;
        // Append order is commit order; newest first.
        let transactions = inner
            .transactions
            .iter()
            .rev()
            .filter(|tx| &tx.user_id == user_id)
            .cloned();
        Ok(page(transactions, offset, limit))
    }

    // =========================================================================
    // Channel Operations
    // =========================================================================

    async fn insert_channel(&self, channel: &Channel) -> Result<()> {
        let mut inner = self.inner.write().await;
        let key = (channel.user_id.clone(), channel.channel_id.clone());
        if inner.channels.contains_key(&key) {
            return Err(StoreError::conflict("channel", &channel.channel_id));
        }
        inner.channels.insert(key, channel.clone());
        Ok(())
    }

    async fn get_channel(
        &self,
        user_id: &UserId,
        channel_id: &ChannelId,
    ) -> Result<Option<Channel>> {
        let inner = self.inner.read().await;
        Ok(inner
            .channels
            .get(&(user_id.clone(), channel_id.clone()))
            .cloned())
    }

    async fn list_channels(&self, user_id: &UserId) -> Result<Vec<Channel>> {
        let inner = self.inner.read().await;
        let mut channels: Vec<_> = inner
            .channels
            .values()
            .filter(|c| &c.user_id == user_id)
            .cloned()
            .collect();
        channels.sort_by_key(|c| c.created_at);
        Ok(channels)
    }

    async fn upsert_similar_channels(&self, rows: &[SimilarChannel]) -> Result<usize> {
        let mut inner = self.inner.write().await;
        for row in rows {
            let key = (row.owner_channel_id.clone(), row.similar_channel_id.clone());
            match inner.similar.get_mut(&key) {
                Some(existing) => {
                    existing.rank = row.rank;
                    existing.relevance_score.clone_from(&row.relevance_score);
                    existing.reasoning.clone_from(&row.reasoning);
                    existing.updated_at = row.updated_at;
                }
                None => {
                    inner.similar.insert(key, row.clone());
                }
            }
        }
        Ok(rows.len())
    }

    async fn list_similar_channels(&self, owner: &ChannelId) -> Result<Vec<SimilarChannel>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<_> = inner
            .similar
            .values()
            .filter(|s| &s.owner_channel_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| a.similar_channel_id.cmp(&b.similar_channel_id))
        });
        Ok(rows)
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    async fn insert_jobs(&self, jobs: &[JobRecord]) -> Result<()> {
        let mut inner = self.inner.write().await;

        let mut batch = HashSet::new();
        for job in jobs {
            if inner.generator_index.contains_key(&job.generator_id)
                || !batch.insert(job.generator_id.as_str())
            {
                return Err(StoreError::conflict("job", &job.generator_id));
            }
        }

        for job in jobs {
            inner
                .generator_index
                .insert(job.generator_id.clone(), job.id);
            inner.jobs.insert(job.id, job.clone());
        }
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        Ok(self.inner.read().await.jobs.get(job_id).cloned())
    }

    async fn find_job_by_generator_id(&self, generator_id: &str) -> Result<Option<JobRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .generator_index
            .get(generator_id)
            .and_then(|id| inner.jobs.get(id))
            .cloned())
    }

    async fn complete_job(
        &self,
        generator_id: &str,
        status: JobStatus,
        url: Option<&str>,
    ) -> Result<JobCompletion> {
        let mut inner = self.inner.write().await;
        let Some(id) = inner.generator_index.get(generator_id).copied() else {
            return Ok(JobCompletion::NotFound);
        };
        let Some(job) = inner.jobs.get_mut(&id) else {
            return Ok(JobCompletion::NotFound);
        };

        if !job.status.can_transition_to(status) {
            return Ok(JobCompletion::AlreadyTerminal(job.clone()));
        }

        job.status = status;
        if let Some(url) = url {
            job.url = Some(url.to_string());
        }
        job.updated_at = Utc::now();
        Ok(JobCompletion::Applied(job.clone()))
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<_> = inner
            .jobs
            .values()
            .filter(|job| query.matches(job))
            .cloned()
            .collect();
        if query.oldest_first {
            jobs.sort_by_key(|j| j.created_at);
        } else {
            jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        if let Some(limit) = query.limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    // =========================================================================
    // Idea Operations
    // =========================================================================

    async fn insert_idea(&self, idea: &VideoIdea) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.ideas.contains_key(&idea.id) {
            return Err(StoreError::conflict("video idea", idea.id));
        }
        inner.ideas.insert(idea.id, idea.clone());
        Ok(())
    }

    async fn get_idea(&self, idea_id: &IdeaId) -> Result<Option<VideoIdea>> {
        Ok(self.inner.read().await.ideas.get(idea_id).cloned())
    }

    async fn list_ideas(
        &self,
        user_id: &UserId,
        channel_id: &ChannelId,
    ) -> Result<Vec<VideoIdea>> {
        let inner = self.inner.read().await;
        let mut ideas: Vec<_> = inner
            .ideas
            .values()
            .filter(|i| &i.user_id == user_id && &i.channel_id == channel_id)
            .cloned()
            .collect();
        ideas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ideas)
    }

    async fn set_idea_plan(
        &self,
        idea_id: &IdeaId,
        plan: &serde_json::Value,
    ) -> Result<VideoIdea> {
        let mut inner = self.inner.write().await;
        let idea = inner
            .ideas
            .get_mut(idea_id)
            .ok_or_else(|| StoreError::not_found("video idea", idea_id))?;
        idea.plan = Some(plan.clone());
        idea.updated_at = Utc::now();
        Ok(idea.clone())
    }

    async fn set_idea_seo(&self, idea_id: &IdeaId, seo: &serde_json::Value) -> Result<VideoIdea> {
        let mut inner = self.inner.write().await;
        let idea = inner
            .ideas
            .get_mut(idea_id)
            .ok_or_else(|| StoreError::not_found("video idea", idea_id))?;
        idea.seo = Some(seo.clone());
        idea.updated_at = Utc::now();
        Ok(idea.clone())
    }
}
