use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{from_unix, parse_uuid};
use crate::models::ListItem;

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: String,
    list_id: String,
    name: String,
    value: String,
    is_marked: bool,
    user_marked_by: Option<String>,
    created_at: i64,
    updated_at: i64,
    received_at: i64,
    is_deleted: bool,
}

impl ItemRow {
    fn into_item(self) -> Result<ListItem, sqlx::Error> {
        Ok(ListItem {
            id: parse_uuid(&self.id)?,
            list_id: parse_uuid(&self.list_id)?,
            name: self.name,
            value: self.value,
            is_marked: self.is_marked,
            user_marked_by: self
                .user_marked_by
                .as_deref()
                .map(parse_uuid)
                .transpose()?,
            created_at: from_unix(self.created_at),
            updated_at: from_unix(self.updated_at),
            received_at: from_unix(self.received_at),
            is_deleted: self.is_deleted,
        })
    }
}

fn rows_to_items(rows: Vec<ItemRow>) -> Result<Vec<ListItem>, sqlx::Error> {
    rows.into_iter().map(ItemRow::into_item).collect()
}

const ITEM_COLUMNS: &str = "id, list_id, name, value, is_marked, user_marked_by, \
                            created_at, updated_at, received_at, is_deleted";

/// Pool-backed item lookups for the pull side.
pub struct ItemsReadRepository {
    pool: SqlitePool,
}

impl ItemsReadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Items in the user's own lists changed after the watermark.
    pub async fn get_updated_for_owner(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<ListItem>, sqlx::Error> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT i.id, i.list_id, i.name, i.value, i.is_marked, i.user_marked_by, \
                    i.created_at, i.updated_at, i.received_at, i.is_deleted \
             FROM items AS i \
             JOIN lists AS l ON i.list_id = l.id \
             WHERE l.owner_id = ? AND i.received_at >= ?",
        )
        .bind(owner_id.to_string())
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows_to_items(rows)
    }

    /// Items in lists shared-and-accepted to the user. A fresh share must
    /// surface items whose own `received_at` predates the watermark.
    pub async fn get_updated_for_shared_list_to_user(
        &self,
        to_user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<ListItem>, sqlx::Error> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT i.id, i.list_id, i.name, i.value, i.is_marked, i.user_marked_by, \
                    i.created_at, i.updated_at, i.received_at, i.is_deleted \
             FROM items AS i \
             JOIN shares AS s ON i.list_id = s.list_id \
             WHERE s.to_user_id = ? AND s.status = 1 AND s.is_deleted = 0 \
               AND (i.received_at >= ? OR s.received_at >= ?)",
        )
        .bind(to_user_id.to_string())
        .bind(since.timestamp())
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows_to_items(rows)
    }

    pub async fn get_for_list(&self, list_id: Uuid) -> Result<Vec<ListItem>, sqlx::Error> {
        let rows: Vec<ItemRow> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE list_id = ?"))
                .bind(list_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows_to_items(rows)
    }
}

/// Transaction-bound lookup: the reconciliation pass must see items it
/// has already written in the same batch.
pub async fn get_item(
    conn: &mut SqliteConnection,
    id: Uuid,
    list_id: Uuid,
) -> Result<Option<ListItem>, sqlx::Error> {
    let row: Option<ItemRow> = sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = ? AND list_id = ?"
    ))
    .bind(id.to_string())
    .bind(list_id.to_string())
    .fetch_optional(conn)
    .await?;

    row.map(ItemRow::into_item).transpose()
}

pub async fn create_item(conn: &mut SqliteConnection, item: &ListItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO items (id, list_id, name, value, is_marked, user_marked_by, \
                            created_at, updated_at, received_at, is_deleted) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(item.id.to_string())
    .bind(item.list_id.to_string())
    .bind(&item.name)
    .bind(&item.value)
    .bind(item.is_marked)
    .bind(item.user_marked_by.map(|id| id.to_string()))
    .bind(item.created_at.timestamp())
    .bind(item.updated_at.timestamp())
    .bind(item.received_at.timestamp())
    .bind(item.is_deleted)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn update_item(conn: &mut SqliteConnection, item: &ListItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE items SET name = ?, value = ?, is_marked = ?, user_marked_by = ?, \
                          updated_at = ?, received_at = ?, is_deleted = ? \
         WHERE id = ? AND list_id = ?",
    )
    .bind(&item.name)
    .bind(&item.value)
    .bind(item.is_marked)
    .bind(item.user_marked_by.map(|id| id.to_string()))
    .bind(item.updated_at.timestamp())
    .bind(item.received_at.timestamp())
    .bind(item.is_deleted)
    .bind(item.id.to_string())
    .bind(item.list_id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::db::{create_list, create_share};
    use crate::models::{epoch, List, ListShare, ShareStatus};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn item(list_id: Uuid, received_secs: i64) -> ListItem {
        ListItem {
            id: Uuid::new_v4(),
            list_id,
            name: "Milk".into(),
            value: "1 l".into(),
            is_marked: false,
            user_marked_by: None,
            created_at: ts(1_700_000_000),
            updated_at: ts(1_700_000_100),
            received_at: ts(received_secs),
            is_deleted: false,
        }
    }

    fn list(owner_id: Uuid) -> List {
        List {
            id: Uuid::new_v4(),
            owner_id,
            name: "Groceries".into(),
            is_template: false,
            created_at: ts(1),
            updated_at: ts(1),
            received_at: ts(1),
            is_deleted: false,
        }
    }

    fn share(list: &List, to_user_id: Uuid, status: ShareStatus, received_secs: i64) -> ListShare {
        ListShare {
            id: Uuid::new_v4(),
            list_id: list.id,
            owner_id: list.owner_id,
            to_user_id,
            status,
            created_at: ts(1),
            updated_at: ts(1),
            received_at: ts(received_secs),
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn test_get_item_roundtrip() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut stored = item(Uuid::new_v4(), 100);
        stored.user_marked_by = Some(Uuid::new_v4());
        stored.is_marked = true;
        create_item(&mut conn, &stored).await.unwrap();

        let found = get_item(&mut conn, stored.id, stored.list_id)
            .await
            .unwrap()
            .unwrap();
        assert!(found.is_equal(&stored));
        assert_eq!(found.user_marked_by, stored.user_marked_by);

        assert!(get_item(&mut conn, stored.id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_updated_for_owner_only_own_lists() {
        let (pool, _dir) = test_pool().await;
        let repo = ItemsReadRepository::new(pool.clone());
        let mut conn = pool.acquire().await.unwrap();

        let owner = Uuid::new_v4();
        let own_list = list(owner);
        let foreign_list = list(Uuid::new_v4());
        create_list(&mut conn, &own_list).await.unwrap();
        create_list(&mut conn, &foreign_list).await.unwrap();

        let own_item = item(own_list.id, 100);
        let foreign_item = item(foreign_list.id, 100);
        create_item(&mut conn, &own_item).await.unwrap();
        create_item(&mut conn, &foreign_item).await.unwrap();

        let found = repo.get_updated_for_owner(owner, epoch()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, own_item.id);
    }

    #[tokio::test]
    async fn test_shared_items_require_accepted_share() {
        let (pool, _dir) = test_pool().await;
        let repo = ItemsReadRepository::new(pool.clone());
        let mut conn = pool.acquire().await.unwrap();

        let invitee = Uuid::new_v4();
        let accepted_list = list(Uuid::new_v4());
        let pending_list = list(Uuid::new_v4());
        create_list(&mut conn, &accepted_list).await.unwrap();
        create_list(&mut conn, &pending_list).await.unwrap();

        create_share(&mut conn, &share(&accepted_list, invitee, ShareStatus::Accepted, 50))
            .await
            .unwrap();
        create_share(&mut conn, &share(&pending_list, invitee, ShareStatus::New, 50))
            .await
            .unwrap();

        let visible = item(accepted_list.id, 100);
        let hidden = item(pending_list.id, 100);
        create_item(&mut conn, &visible).await.unwrap();
        create_item(&mut conn, &hidden).await.unwrap();

        let found = repo
            .get_updated_for_shared_list_to_user(invitee, epoch())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, visible.id);
    }

    #[tokio::test]
    async fn test_get_for_list() {
        let (pool, _dir) = test_pool().await;
        let repo = ItemsReadRepository::new(pool.clone());
        let mut conn = pool.acquire().await.unwrap();

        let list_id = Uuid::new_v4();
        create_item(&mut conn, &item(list_id, 100)).await.unwrap();
        create_item(&mut conn, &item(list_id, 200)).await.unwrap();
        create_item(&mut conn, &item(Uuid::new_v4(), 100))
            .await
            .unwrap();

        let found = repo.get_for_list(list_id).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|i| i.list_id == list_id));
    }

    #[tokio::test]
    async fn test_fresh_share_surfaces_old_items() {
        let (pool, _dir) = test_pool().await;
        let repo = ItemsReadRepository::new(pool.clone());
        let mut conn = pool.acquire().await.unwrap();

        let invitee = Uuid::new_v4();
        let shared_list = list(Uuid::new_v4());
        create_list(&mut conn, &shared_list).await.unwrap();

        // Item predates the watermark; the share does not.
        let old_item = item(shared_list.id, 100);
        create_item(&mut conn, &old_item).await.unwrap();
        create_share(&mut conn, &share(&shared_list, invitee, ShareStatus::Accepted, 900))
            .await
            .unwrap();

        let found = repo
            .get_updated_for_shared_list_to_user(invitee, ts(500))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, old_item.id);
    }
}
