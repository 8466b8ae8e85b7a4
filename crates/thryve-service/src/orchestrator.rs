//! Job submission orchestrator.
//!
//! Every paid agent feature follows the same envelope:
//!
//! 1. The caller has already checked channel ownership and input.
//! 2. Fail before charging if the agent is not configured.
//! 3. Debit the operation's cost.
//! 4. Call the agent with a bounded timeout.
//! 5. Asynchronous features persist a `PROCESSING` job keyed by the agent's
//!    request id; synchronous features hand the reply back to the caller.
//!
//! A failed agent call, or a job that cannot be saved after the agent
//! accepted it, is compensated according to the refund policy.

use serde::Serialize;

use thryve_core::{Channel, ChannelId, JobRecord, Operation, UserId};
use thryve_store::Store;

use crate::agent::{AgentError, AgentFeature, AgentReply};
use crate::error::ApiError;
use crate::ledger::Debit;
use crate::state::AppState;

/// Resolve a channel owned by `user_id`.
///
/// Channels of other users are reported as missing.
pub async fn owned_channel(
    state: &AppState,
    user_id: &UserId,
    channel_id: &ChannelId,
) -> Result<Channel, ApiError> {
    state
        .store
        .get_channel(user_id, channel_id)
        .await?
        .filter(|c| c.is_owned_by(user_id))
        .ok_or_else(|| ApiError::NotFound("Channel not found".into()))
}

/// Parse a channel id from request input.
pub fn parse_channel_id(raw: &str) -> Result<ChannelId, ApiError> {
    ChannelId::new(raw).map_err(|e| ApiError::BadRequest(format!("Invalid channelId: {e}")))
}

/// An asynchronous job to start.
#[derive(Debug, Clone)]
pub struct JobSubmission<P> {
    /// Owner.
    pub user_id: UserId,
    /// Operation charged.
    pub operation: Operation,
    /// Agent endpoint.
    pub feature: AgentFeature,
    /// Agent request body.
    pub payload: P,
    /// Record to persist; its generator id is replaced by the agent's
    /// request id.
    pub record: JobRecord,
}

/// Result of a started job.
#[derive(Debug, Clone)]
pub struct SubmittedJob {
    /// The persisted record.
    pub job: JobRecord,
    /// Records persisted with it.
    pub children: Vec<JobRecord>,
    /// The charge.
    pub debit: Debit,
}

/// Charge, start an agent job and persist its `PROCESSING` record.
///
/// `children` builds records saved atomically with the job, given the job.
pub async fn submit_job<P, F>(
    state: &AppState,
    submission: JobSubmission<P>,
    children: F,
) -> Result<SubmittedJob, ApiError>
where
    P: Serialize + Send + Sync,
    F: FnOnce(&JobRecord) -> Vec<JobRecord> + Send,
{
    let JobSubmission {
        user_id,
        operation,
        feature,
        payload,
        mut record,
    } = submission;

    state.agents.ensure_configured(feature)?;

    let debit = state.ledger.try_debit(&user_id, operation).await?;

    let accepted = match state.agents.submit(feature, &payload).await {
        Ok(accepted) => accepted,
        Err(e) => return Err(fail_after_debit(state, &debit, e).await),
    };

    record.generator_id = accepted.request_id;
    let children = children(&record);

    let mut batch = Vec::with_capacity(children.len() + 1);
    batch.push(record.clone());
    batch.extend(children.iter().cloned());

    if let Err(e) = state.store.insert_jobs(&batch).await {
        tracing::error!(
            user_id = %user_id,
            generator_id = %record.generator_id,
            kind = %record.kind.as_str(),
            error = %e,
            "Failed to persist accepted job"
        );
        state
            .ledger
            .compensate(&debit, "job could not be recorded")
            .await;
        return Err(e.into());
    }

    tracing::info!(
        user_id = %user_id,
        channel_id = %record.channel_id,
        job_id = %record.id,
        generator_id = %record.generator_id,
        kind = %record.kind.as_str(),
        children = children.len(),
        "Job submitted"
    );

    Ok(SubmittedJob {
        job: record,
        children,
        debit,
    })
}

/// Charge and call a synchronous feature.
///
/// When `required` is set, a reply without a value at that JSON pointer is
/// an agent failure.
pub async fn call_metered<P: Serialize + Sync>(
    state: &AppState,
    user_id: &UserId,
    operation: Operation,
    feature: AgentFeature,
    payload: &P,
    required: Option<&'static str>,
) -> Result<(AgentReply, Debit), ApiError> {
    state.agents.ensure_configured(feature)?;

    let debit = state.ledger.try_debit(user_id, operation).await?;

    let reply = match state.agents.reply(feature, payload).await {
        Ok(reply) => reply,
        Err(e) => return Err(fail_after_debit(state, &debit, e).await),
    };

    if let Some(pointer) = required {
        if reply.at(pointer).is_none() {
            let err = AgentError::MissingField {
                field: pointer,
                body: reply.body,
            };
            return Err(fail_after_debit(state, &debit, err).await);
        }
    }

    Ok((reply, debit))
}

async fn fail_after_debit(state: &AppState, debit: &Debit, err: AgentError) -> ApiError {
    let reason = format!("{} failed: {err}", debit.operation.key());
    state.ledger.compensate(debit, &reason).await;
    err.into()
}
