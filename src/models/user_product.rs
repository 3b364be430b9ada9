//! Personal favorite products. Single-owner, no sharing semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{epoch, is_zero_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProduct {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category_id: i64,
    #[serde(default)]
    pub global_product_id: i64,
    pub name: String,
    pub is_favorite: bool,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds", default = "epoch")]
    pub received_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl UserProduct {
    /// Structural equality for idempotent replay, everything but the
    /// server-assigned `received_at`.
    pub fn is_equal(&self, other: &UserProduct) -> bool {
        self.id == other.id
            && self.owner_id == other.owner_id
            && self.category_id == other.category_id
            && self.global_product_id == other.global_product_id
            && self.name == other.name
            && self.is_favorite == other.is_favorite
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
            && self.is_deleted == other.is_deleted
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.chars().count() > 100 {
            return Err("product name must be 1-100 characters".into());
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
