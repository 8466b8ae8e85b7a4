//! Database schema definitions.
//!
//! Table names used by the PostgreSQL backend. The DDL lives in
//! `migrations/` and is embedded at compile time.

/// Table names for the PostgreSQL database.
pub mod table {
    /// Users and their credit balance, keyed by `id`.
    pub const USERS: &str = "users";

    /// Credit ledger, keyed by `id` (ULID). `reference` is unique when set.
    pub const CREDIT_TRANSACTIONS: &str = "credit_transactions";

    /// Linked channels, unique on `(user_id, channel_id)`.
    pub const CHANNELS: &str = "channels";

    /// Competitor associations, unique on
    /// `(owner_channel_id, similar_channel_id)`.
    pub const SIMILAR_CHANNELS: &str = "similar_channels";

    /// Job records of every kind, unique on `generator_id`.
    pub const JOBS: &str = "jobs";

    /// Video ideas, keyed by `id`.
    pub const VIDEO_IDEAS: &str = "video_ideas";
}

/// Returns all table names, children before parents.
#[must_use]
pub fn all_tables() -> Vec<&'static str> {
    vec![
        table::CREDIT_TRANSACTIONS,
        table::SIMILAR_CHANNELS,
        table::JOBS,
        table::VIDEO_IDEAS,
        table::CHANNELS,
        table::USERS,
    ]
}

/// Embedded migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
