//! Persisted notification rows, produced by the event listeners after a
//! reconciliation pass commits.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Wire values 1-10 are fixed; mobile clients switch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "i64")]
pub enum NotificationKind {
    ListInvite,
    ListJoining,
    ListDetachment,
    GoodsCreate,
    GoodsCheck,
    GoodsUncheck,
    GoodsChange,
    GoodsDelete,
    ListShareDelete,
    ListDelete,
}

impl From<NotificationKind> for i64 {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::ListInvite => 1,
            NotificationKind::ListJoining => 2,
            NotificationKind::ListDetachment => 3,
            NotificationKind::GoodsCreate => 4,
            NotificationKind::GoodsCheck => 5,
            NotificationKind::GoodsUncheck => 6,
            NotificationKind::GoodsChange => 7,
            NotificationKind::GoodsDelete => 8,
            NotificationKind::ListShareDelete => 9,
            NotificationKind::ListDelete => 10,
        }
    }
}

impl TryFrom<i64> for NotificationKind {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(NotificationKind::ListInvite),
            2 => Ok(NotificationKind::ListJoining),
            3 => Ok(NotificationKind::ListDetachment),
            4 => Ok(NotificationKind::GoodsCreate),
            5 => Ok(NotificationKind::GoodsCheck),
            6 => Ok(NotificationKind::GoodsUncheck),
            7 => Ok(NotificationKind::GoodsChange),
            8 => Ok(NotificationKind::GoodsDelete),
            9 => Ok(NotificationKind::ListShareDelete),
            10 => Ok(NotificationKind::ListDelete),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    /// The acting user (who made the change).
    pub user_id: Uuid,
    pub user_phone: i64,
    pub list_id: Uuid,
    pub item_id: Option<Uuid>,
    /// The recipient.
    #[serde(skip)]
    pub target_user_id: Uuid,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}
