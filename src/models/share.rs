//! List sharing invitations.
//!
//! A share connects one list (via `list_id` + `owner_id`) to an invited
//! user. Two disjoint mutation authorities exist: the owner controls every
//! field except `status`; the invitee controls only `status`, and only
//! away from `New`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{epoch, is_zero_timestamp};

/// Invitation state. Wire representation is 0/1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ShareStatus {
    New,
    Accepted,
    Refused,
}

impl TryFrom<i64> for ShareStatus {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShareStatus::New),
            1 => Ok(ShareStatus::Accepted),
            2 => Ok(ShareStatus::Refused),
            other => Err(format!("unknown share status: {other}")),
        }
    }
}

impl From<ShareStatus> for i64 {
    fn from(status: ShareStatus) -> Self {
        match status {
            ShareStatus::New => 0,
            ShareStatus::Accepted => 1,
            ShareStatus::Refused => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListShare {
    pub id: Uuid,
    pub list_id: Uuid,
    pub owner_id: Uuid,
    pub to_user_id: Uuid,
    pub status: ShareStatus,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds", default = "epoch")]
    pub received_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl ListShare {
    /// Structural equality for idempotent replay. `owner_id` never changes
    /// (lookups are owner-scoped) and `received_at` is server-assigned;
    /// both are excluded.
    pub fn is_equal(&self, other: &ListShare) -> bool {
        self.id == other.id
            && self.list_id == other.list_id
            && self.to_user_id == other.to_user_id
            && self.status == other.status
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
            && self.is_deleted == other.is_deleted
    }

    pub fn validate(&self) -> Result<(), String> {
        if is_zero_timestamp(&self.created_at) {
            return Err("created_at is not set".into());
        }
        if is_zero_timestamp(&self.updated_at) {
            return Err("updated_at is not set".into());
        }
        Ok(())
    }
}
