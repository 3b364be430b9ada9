use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{from_unix, parse_uuid, placeholders};
use crate::models::{ListShare, ShareStatus};

#[derive(sqlx::FromRow)]
struct ShareRow {
    id: String,
    list_id: String,
    owner_id: String,
    to_user_id: String,
    status: i64,
    created_at: i64,
    updated_at: i64,
    received_at: i64,
    is_deleted: bool,
}

impl ShareRow {
    fn into_share(self) -> Result<ListShare, sqlx::Error> {
        let status = ShareStatus::try_from(self.status)
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(ListShare {
            id: parse_uuid(&self.id)?,
            list_id: parse_uuid(&self.list_id)?,
            owner_id: parse_uuid(&self.owner_id)?,
            to_user_id: parse_uuid(&self.to_user_id)?,
            status,
            created_at: from_unix(self.created_at),
            updated_at: from_unix(self.updated_at),
            received_at: from_unix(self.received_at),
            is_deleted: self.is_deleted,
        })
    }
}

fn rows_to_shares(rows: Vec<ShareRow>) -> Result<Vec<ListShare>, sqlx::Error> {
    rows.into_iter().map(ShareRow::into_share).collect()
}

const SELECT_SHARE: &str =
    "SELECT id, list_id, owner_id, to_user_id, status, created_at, updated_at, received_at, is_deleted \
     FROM shares";

pub struct SharesReadRepository {
    pool: SqlitePool,
}

impl SharesReadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_share(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<ListShare>, sqlx::Error> {
        let row: Option<ShareRow> =
            sqlx::query_as(&format!("{SELECT_SHARE} WHERE id = ? AND owner_id = ?"))
                .bind(id.to_string())
                .bind(owner_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(ShareRow::into_share).transpose()
    }

    pub async fn get_updated_for_owner(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<ListShare>, sqlx::Error> {
        let rows: Vec<ShareRow> =
            sqlx::query_as(&format!("{SELECT_SHARE} WHERE owner_id = ? AND received_at >= ?"))
                .bind(owner_id.to_string())
                .bind(since.timestamp())
                .fetch_all(&self.pool)
                .await?;

        rows_to_shares(rows)
    }

    pub async fn get_updated_to_user(
        &self,
        to_user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<ListShare>, sqlx::Error> {
        let rows: Vec<ShareRow> =
            sqlx::query_as(&format!("{SELECT_SHARE} WHERE to_user_id = ? AND received_at >= ?"))
                .bind(to_user_id.to_string())
                .bind(since.timestamp())
                .fetch_all(&self.pool)
                .await?;

        rows_to_shares(rows)
    }

    /// Shares addressed to `user_id` for any of the given lists,
    /// regardless of status; the caller applies the status policy.
    pub async fn get_for_user_for_list_ids(
        &self,
        list_ids: &[Uuid],
        user_id: Uuid,
    ) -> Result<Vec<ListShare>, sqlx::Error> {
        if list_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{SELECT_SHARE} WHERE list_id IN ({}) AND to_user_id = ?",
            placeholders(list_ids.len())
        );
        let mut query = sqlx::query_as::<_, ShareRow>(&sql);
        for id in list_ids {
            query = query.bind(id.to_string());
        }
        let rows = query
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows_to_shares(rows)
    }

    /// Invitees who accepted a list and were not revoked. These are the
    /// notification recipients for item changes on that list.
    pub async fn get_accepted_user_ids_for_list(
        &self,
        list_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT to_user_id FROM shares \
             WHERE list_id = ? AND owner_id = ? AND status = ? AND is_deleted = 0",
        )
        .bind(list_id.to_string())
        .bind(owner_id.to_string())
        .bind(i64::from(ShareStatus::Accepted))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|(id,)| parse_uuid(id)).collect()
    }
}

pub async fn create_share(
    conn: &mut SqliteConnection,
    share: &ListShare,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO shares (id, list_id, owner_id, to_user_id, status, created_at, updated_at, received_at, is_deleted) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(share.id.to_string())
    .bind(share.list_id.to_string())
    .bind(share.owner_id.to_string())
    .bind(share.to_user_id.to_string())
    .bind(i64::from(share.status))
    .bind(share.created_at.timestamp())
    .bind(share.updated_at.timestamp())
    .bind(share.received_at.timestamp())
    .bind(share.is_deleted)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn update_share(
    conn: &mut SqliteConnection,
    share: &ListShare,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE shares SET list_id = ?, to_user_id = ?, status = ?, created_at = ?, updated_at = ?, received_at = ?, is_deleted = ? \
         WHERE id = ? AND owner_id = ?",
    )
    .bind(share.list_id.to_string())
    .bind(share.to_user_id.to_string())
    .bind(i64::from(share.status))
    .bind(share.created_at.timestamp())
    .bind(share.updated_at.timestamp())
    .bind(share.received_at.timestamp())
    .bind(share.is_deleted)
    .bind(share.id.to_string())
    .bind(share.owner_id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}
