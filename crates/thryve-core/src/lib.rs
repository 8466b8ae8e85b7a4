//! Core types for Thryve.
//!
//! This crate provides the domain types shared by the store and the service:
//!
//! - **Identifiers**: `UserId`, `ChannelId`, `JobId`, `IdeaId`, `TransactionId`
//! - **Users**: `User` and its integer credit balance
//! - **Channels**: `Channel`, `SimilarChannel`
//! - **Jobs**: `JobRecord`, `JobKind`, `JobStatus`
//! - **Credits**: `CreditTransaction`, `TransactionType`, `CreditPack`
//! - **Costs**: `Operation`, `CreditCosts`
//!
//! # Credits
//!
//! A credit is an integer unit of prepaid usage. Each metered operation has a
//! fixed cost from the [`CreditCosts`] table, and a balance never goes below
//! zero.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod channel;
pub mod costs;
pub mod credits;
pub mod error;
pub mod idea;
pub mod ids;
pub mod jobs;
pub mod user;

pub use channel::{Channel, SimilarChannel, UNKNOWN_RELEVANCE};
pub use costs::{CostEntry, CreditCosts, Operation};
pub use credits::{CreditPack, CreditTransaction, TransactionType, CREDIT_PACKS};
pub use error::{Result, ThryveError};
pub use idea::VideoIdea;
pub use ids::{ChannelId, IdError, IdeaId, JobId, TransactionId, UserId, MAX_EXTERNAL_ID_LEN};
pub use jobs::{
    local_generator_id, media_asset_type, JobKind, JobRecord, JobStatus, AUDIO_ASSET_TYPE,
    IMAGE_ASSET_TYPE, VIDEO_ASSET_TYPE,
};
pub use user::User;
