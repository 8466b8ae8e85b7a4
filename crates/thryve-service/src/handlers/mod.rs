//! HTTP request handlers.

pub mod assets;
pub mod billing;
pub mod channels;
pub mod credits;
pub mod critique;
pub mod ctr;
pub mod discovery;
pub mod health;
pub mod ideas;
pub mod jobs;
pub mod reels;
pub mod thumbnails;
pub mod users;
pub mod webhooks;
