//! Identifier types for Thryve.
//!
//! Two families of identifiers exist:
//!
//! - **Internal** ids (`JobId`, `IdeaId`) are UUIDs generated by this service.
//! - **External** ids (`UserId`, `ChannelId`) are opaque strings issued by the
//!   identity provider and by YouTube. They are validated but never generated
//!   here outside of tests.
//!
//! Credit transactions use ULIDs so that the ledger sorts chronologically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Maximum accepted length for externally issued identifiers.
pub const MAX_EXTERNAL_ID_LEN: usize = 128;

/// Macro to define a UUID-based identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `uuid::Uuid` with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `Serialize`, `Deserialize` (as string)
/// - `FromStr`, `Display`, `Debug`
/// - `TryFrom<String>`, `Into<String>`
macro_rules! uuid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

/// Macro to define an identifier issued by an external system.
///
/// The wrapped string is validated on construction: it must be non-empty,
/// at most [`MAX_EXTERNAL_ID_LEN`] bytes, and consist of ASCII alphanumerics,
/// `_` or `-`.
macro_rules! external_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an externally issued identifier.
            ///
            /// # Errors
            ///
            /// Returns an error if the value is empty, too long, or contains
            /// characters outside `[A-Za-z0-9_-]`.
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                validate_external_id(&value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

fn validate_external_id(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.len() > MAX_EXTERNAL_ID_LEN {
        return Err(IdError::TooLong);
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(IdError::InvalidCharacters);
    }
    Ok(())
}

external_id_type!(UserId, "A user identifier issued by the identity provider.\n\nExtracted from the JWT `sub` claim.");
external_id_type!(ChannelId, "A YouTube channel identifier (e.g. `UC...`).\n\nStable and issued by YouTube; unique per user, not globally.");

uuid_id_type!(JobId, "Internal identifier of a job record.");
uuid_id_type!(IdeaId, "Internal identifier of a video idea.");

/// A credit transaction identifier using ULID for time-ordering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(Ulid);

impl TransactionId {
    /// Generate a new `TransactionId` with the current timestamp.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl FromStr for TransactionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
        Ok(Self(ulid))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,

    /// The identifier is empty.
    #[error("identifier is empty")]
    Empty,

    /// The identifier exceeds the maximum length.
    #[error("identifier exceeds {} characters", MAX_EXTERNAL_ID_LEN)]
    TooLong,

    /// The identifier contains characters outside `[A-Za-z0-9_-]`.
    #[error("identifier contains invalid characters")]
    InvalidCharacters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_provider_format() {
        let id = UserId::new("user_2NfXq8Zk-abc").unwrap();
        assert_eq!(id.as_str(), "user_2NfXq8Zk-abc");
        assert_eq!(id.to_string(), "user_2NfXq8Zk-abc");
    }

    #[test]
    fn external_ids_reject_bad_input() {
        assert_eq!(UserId::new(""), Err(IdError::Empty));
        assert_eq!(ChannelId::new("UC abc"), Err(IdError::InvalidCharacters));
        assert_eq!(ChannelId::new("UC/../x"), Err(IdError::InvalidCharacters));
        assert_eq!(
            ChannelId::new("x".repeat(MAX_EXTERNAL_ID_LEN + 1)),
            Err(IdError::TooLong)
        );
    }

    #[test]
    fn channel_id_deserialize_validates() {
        let ok: ChannelId = serde_json::from_str("\"UCabc_123\"").unwrap();
        assert_eq!(ok.as_str(), "UCabc_123");
        assert!(serde_json::from_str::<ChannelId>("\"\"").is_err());
    }

    #[test]
    fn job_id_parse_rejects_garbage() {
        assert_eq!("not-a-uuid".parse::<JobId>(), Err(IdError::InvalidUuid));
        let id = JobId::generate();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
    }

    #[test]
    fn transaction_ids_sort_by_time() {
        let first = TransactionId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = TransactionId::generate();
        assert!(first < second);
    }
}
