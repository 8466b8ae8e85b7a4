//! Error types for Thryve storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A record with the same key already exists.
    #[error("{entity} already exists: {id}")]
    Conflict {
        /// Kind of record.
        entity: &'static str,
        /// Conflicting key.
        id: String,
    },

    /// A grant would push the balance past the storable range.
    #[error("balance overflow for user: {user_id}")]
    BalanceOverflow {
        /// The user whose balance would overflow.
        user_id: String,
    },

    /// A credit grant with this external reference was already applied.
    #[error("duplicate credit reference: {reference}")]
    DuplicateReference {
        /// The external reference.
        reference: String,
    },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(entity: &'static str, id: impl ToString) -> Self {
        Self::Conflict {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Database(format!("migration failed: {e}"))
    }
}

impl From<thryve_core::ThryveError> for StoreError {
    fn from(e: thryve_core::ThryveError) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<thryve_core::IdError> for StoreError {
    fn from(e: thryve_core::IdError) -> Self {
        Self::Serialization(format!("stored identifier is invalid: {e}"))
    }
}
