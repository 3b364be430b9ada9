use sqlx::SqlitePool;
use uuid::Uuid;

use super::{from_unix, parse_uuid};
use crate::models::{Notification, NotificationKind};

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    kind: i64,
    message: String,
    user_id: String,
    user_phone: i64,
    list_id: String,
    item_id: Option<String>,
    target_user_id: String,
    created_at: i64,
}

impl NotificationRow {
    fn into_notification(self) -> Result<Notification, sqlx::Error> {
        let kind = NotificationKind::try_from(self.kind)
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(Notification {
            id: parse_uuid(&self.id)?,
            kind,
            message: self.message,
            user_id: parse_uuid(&self.user_id)?,
            user_phone: self.user_phone,
            list_id: parse_uuid(&self.list_id)?,
            item_id: self.item_id.as_deref().map(parse_uuid).transpose()?,
            target_user_id: parse_uuid(&self.target_user_id)?,
            created_at: from_unix(self.created_at),
        })
    }
}

/// Listener output. Writes run outside the sync transaction: a failed
/// notification never rolls back a committed batch.
pub struct NotificationsRepository {
    pool: SqlitePool,
}

impl NotificationsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, notification: &Notification) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO notifications (id, kind, message, user_id, user_phone, list_id, item_id, target_user_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(notification.id.to_string())
        .bind(i64::from(notification.kind))
        .bind(&notification.message)
        .bind(notification.user_id.to_string())
        .bind(notification.user_phone)
        .bind(notification.list_id.to_string())
        .bind(notification.item_id.map(|id| id.to_string()))
        .bind(notification.target_user_id.to_string())
        .bind(notification.created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Notification>, sqlx::Error> {
        let row: Option<NotificationRow> = sqlx::query_as(
            "SELECT id, kind, message, user_id, user_phone, list_id, item_id, target_user_id, created_at \
             FROM notifications WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(NotificationRow::into_notification).transpose()
    }

    pub async fn get_for_target_user(
        &self,
        target_user_id: Uuid,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT id, kind, message, user_id, user_phone, list_id, item_id, target_user_id, created_at \
             FROM notifications WHERE target_user_id = ? ORDER BY created_at",
        )
        .bind(target_user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }
}
