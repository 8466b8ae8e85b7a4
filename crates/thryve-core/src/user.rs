//! User types for Thryve.
//!
//! A user carries the integer credit balance that metered features draw on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A registered user and their credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity-provider issued id.
    pub id: UserId,

    /// Display name.
    pub name: Option<String>,

    /// Email address.
    pub email: Option<String>,

    /// Avatar URL.
    pub image_url: Option<String>,

    /// Current credit balance. Never negative once a write has committed.
    pub credits: i64,

    /// When the user was provisioned.
    pub created_at: DateTime<Utc>,

    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with the given starting balance.
    #[must_use]
    pub fn new(id: UserId, credits: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: None,
            email: None,
            image_url: None,
            credits: credits.max(0),
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach profile fields.
    #[must_use]
    pub fn with_profile(
        mut self,
        name: Option<String>,
        email: Option<String>,
        image_url: Option<String>,
    ) -> Self {
        self.name = name;
        self.email = email;
        self.image_url = image_url;
        self
    }

    /// Check if the user can afford a charge.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.credits >= amount
    }
}
