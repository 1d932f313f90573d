//! Subscriber Entity
//!
//! A library patron record. Loyalty is a derived status: it must equal
//! `consecutive_subscriptions >= LOYALTY_THRESHOLD && !has_penalty` after
//! every operation that touches either input field; the recompute lives in
//! [`crate::subscriber::loyalty`] and is driven by the operations.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscriber gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Subscriber entity - a library patron
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    #[serde(rename = "_id")]
    pub id: String,

    /// Given name
    pub name: String,

    /// Family name
    pub surname: String,

    /// Unique across all subscribers (exact match)
    pub email: String,

    /// Unique across all subscribers (exact match)
    pub phone: String,

    pub age: u8,

    pub gender: Gender,

    /// Streak counter, incremented on each renewal, reset by a penalty.
    #[serde(default)]
    pub consecutive_subscriptions: u32,

    /// Outstanding infraction reported by the loan-management service.
    #[serde(default)]
    pub has_penalty: bool,

    /// Derived: `consecutive_subscriptions >= 3 && !has_penalty`.
    #[serde(default)]
    pub is_loyal: bool,

    /// False means deactivated - a terminal soft-delete state.
    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Subscriber {
    /// Create a new subscriber with registration defaults.
    pub fn new(
        name: impl Into<String>,
        surname: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        age: u8,
        gender: Gender,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            surname: surname.into(),
            email: email.into(),
            phone: phone.into(),
            age,
            gender,
            consecutive_subscriptions: 0,
            has_penalty: false,
            is_loyal: false,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }

    /// Set the penalty flag. Setting it resets the streak; clearing it does
    /// not restore the prior streak.
    pub fn record_penalty(&mut self, has_penalty: bool) {
        self.has_penalty = has_penalty;
        if has_penalty {
            self.consecutive_subscriptions = 0;
        }
        self.updated_at = Utc::now();
    }

    /// Count one successful renewal.
    pub fn record_renewal(&mut self) {
        self.consecutive_subscriptions += 1;
        self.updated_at = Utc::now();
    }

    pub fn set_loyalty(&mut self, is_loyal: bool) {
        self.is_loyal = is_loyal;
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
