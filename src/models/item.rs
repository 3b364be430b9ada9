//! List items (goods).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{epoch, is_zero_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub name: String,
    /// Free-form quantity ("2 kg", "a few").
    pub value: String,
    /// Bought / checked off.
    pub is_marked: bool,
    /// Who marked the item. Required whenever `is_marked` is true and must
    /// reference an existing user.
    pub user_marked_by: Option<Uuid>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds", default = "epoch")]
    pub received_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl ListItem {
    /// Structural equality for idempotent replay. `created_at` and
    /// `received_at` are excluded.
    pub fn is_equal(&self, other: &ListItem) -> bool {
        self.id == other.id
            && self.list_id == other.list_id
            && self.name == other.name
            && self.value == other.value
            && self.is_marked == other.is_marked
            && self.user_marked_by == other.user_marked_by
            && self.updated_at == other.updated_at
            && self.is_deleted == other.is_deleted
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.chars().count() > 140 {
            return Err("item name must be 1-140 characters".into());
        }
        if self.value.chars().count() > 50 {
            return Err("item value must be at most 50 characters".into());
        }
        if self.is_marked && self.user_marked_by.is_none() {
            return Err("marked item has no user_marked_by".into());
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
