//! Stripe integration for credit pack purchases.
//!
//! Stripe handles:
//! - `PaymentIntent` creation for a credit pack
//! - Payment verification before credits are granted
//! - Webhook delivery of `payment_intent.succeeded`

pub mod client;
pub mod types;

pub use client::StripeClient;
pub use client::StripeError;
pub use types::*;
