//! Shopping lists.
//!
//! A list is identified by the pair `(id, owner_id)` for access purposes;
//! the same id is never expected to exist under two owners, but every
//! lookup stays owner-scoped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{epoch, is_zero_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Immutable after creation. Items on template lists can never be
    /// marked as bought.
    pub is_template: bool,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds", default = "epoch")]
    pub received_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl List {
    /// Structural equality for idempotent replay. `received_at` is
    /// server-assigned and excluded from the comparison.
    pub fn is_equal(&self, other: &List) -> bool {
        self.id == other.id
            && self.owner_id == other.owner_id
            && self.name == other.name
            && self.is_template == other.is_template
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
            && self.is_deleted == other.is_deleted
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.chars().count() > 100 {
            return Err("list name must be 1-100 characters".into());
        }
        if is_zero_timestamp(&self.created_at) {
            return Err("created_at is not set".into());
        }
        if is_zero_timestamp(&self.updated_at) {
            return Err("updated_at is not set".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> List {
        List {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Groceries".into(),
            is_template: false,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
            received_at: epoch(),
            is_deleted: false,
        }
    }

    #[test]
    fn equality_ignores_received_at() {
        let a = sample();
        let mut b = a.clone();
        b.received_at = Utc.timestamp_opt(1_800_000_000, 0).unwrap();
        assert!(a.is_equal(&b));
    }

    #[test]
    fn equality_sees_field_changes() {
        let a = sample();

        let mut b = a.clone();
        b.name = "Hardware".into();
        assert!(!a.is_equal(&b));

        let mut c = a.clone();
        c.is_deleted = true;
        assert!(!a.is_equal(&c));
    }

    #[test]
    fn validate_rejects_empty_name_and_zero_timestamps() {
        let mut list = sample();
        list.name = String::new();
        assert!(list.validate().is_err());

        let mut list = sample();
        list.created_at = epoch();
        assert!(list.validate().is_err());

        assert!(sample().validate().is_ok());
    }
}
