//! Error types for Thryve domain logic.

use crate::ids::IdError;

/// Result type for Thryve domain operations.
pub type Result<T> = std::result::Result<T, ThryveError>;

/// Errors that can occur in domain operations.
#[derive(Debug, thiserror::Error)]
pub enum ThryveError {
    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// A stored or supplied enum value is not recognized.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Cost table names an operation that does not exist.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Cost table entry is not a positive integer.
    #[error("invalid cost for {operation}: {cost}")]
    InvalidCost {
        /// Operation key.
        operation: String,
        /// Rejected cost.
        cost: i64,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}
