//! Thryve HTTP API Service.
//!
//! This crate provides the HTTP API for Thryve, including:
//!
//! - User provisioning, channels and video ideas
//! - Credit balance, transactions and Stripe credit packs
//! - Paid agent features (voice, thumbnails, reels, discovery, plans, SEO, CTR)
//!   and the free comment critique
//! - The agent completion webhook and job record reads
//!
//! # Credits
//!
//! Every paid feature debits its cost before the agent is called. A failed
//! agent call is refunded according to the configured [`config::RefundPolicy`].
//!
//! # Authentication
//!
//! User requests carry a JWT bearer token verified against the auth
//! provider's JWKS. Admin endpoints take the `X-Admin-Key` header. Webhooks
//! are verified by signature.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers without awaits keep the async signature
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod ledger;
pub mod orchestrator;
pub mod routes;
pub mod state;
pub mod stripe;

pub use agent::{AgentClient, AgentError};
pub use config::{RefundPolicy, ServiceConfig};
pub use error::ApiError;
pub use ledger::CreditLedger;
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
