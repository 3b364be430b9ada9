use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{from_unix, parse_uuid, placeholders};
use crate::models::List;

#[derive(sqlx::FromRow)]
struct ListRow {
    id: String,
    owner_id: String,
    name: String,
    is_template: bool,
    created_at: i64,
    updated_at: i64,
    received_at: i64,
    is_deleted: bool,
}

impl ListRow {
    fn into_list(self) -> Result<List, sqlx::Error> {
        Ok(List {
            id: parse_uuid(&self.id)?,
            owner_id: parse_uuid(&self.owner_id)?,
            name: self.name,
            is_template: self.is_template,
            created_at: from_unix(self.created_at),
            updated_at: from_unix(self.updated_at),
            received_at: from_unix(self.received_at),
            is_deleted: self.is_deleted,
        })
    }
}

fn rows_to_lists(rows: Vec<ListRow>) -> Result<Vec<List>, sqlx::Error> {
    rows.into_iter().map(ListRow::into_list).collect()
}

const SELECT_LIST: &str =
    "SELECT id, owner_id, name, is_template, created_at, updated_at, received_at, is_deleted \
     FROM lists";

/// Pool-backed list lookups. Reads do not observe uncommitted batch
/// writes; the sync engine's request cache covers those.
pub struct ListsReadRepository {
    pool: SqlitePool,
}

impl ListsReadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List lookups are always owner-scoped: list identity is the pair
    /// `(id, owner_id)`.
    pub async fn get_for_id_and_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<List>, sqlx::Error> {
        let row: Option<ListRow> =
            sqlx::query_as(&format!("{SELECT_LIST} WHERE id = ? AND owner_id = ?"))
                .bind(id.to_string())
                .bind(owner_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(ListRow::into_list).transpose()
    }

    pub async fn get_for_ids_and_owner(
        &self,
        ids: &[Uuid],
        owner_id: Uuid,
    ) -> Result<Vec<List>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{SELECT_LIST} WHERE id IN ({}) AND owner_id = ?",
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, ListRow>(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query
            .bind(owner_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows_to_lists(rows)
    }

    pub async fn get_updated_for_owner(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<List>, sqlx::Error> {
        let rows: Vec<ListRow> =
            sqlx::query_as(&format!("{SELECT_LIST} WHERE owner_id = ? AND received_at >= ?"))
                .bind(owner_id.to_string())
                .bind(since.timestamp())
                .fetch_all(&self.pool)
                .await?;

        rows_to_lists(rows)
    }

    /// Lists shared to a user, changed after the watermark on either side:
    /// a fresh share must surface a list whose own `received_at` is old.
    pub async fn get_updated_shared_to_user(
        &self,
        to_user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<List>, sqlx::Error> {
        let rows: Vec<ListRow> = sqlx::query_as(
            "SELECT l.id, l.owner_id, l.name, l.is_template, \
                    l.created_at, l.updated_at, l.received_at, l.is_deleted \
             FROM lists AS l \
             JOIN shares AS s ON l.id = s.list_id AND l.owner_id = s.owner_id \
             WHERE s.to_user_id = ? AND (s.received_at >= ? OR l.received_at >= ?)",
        )
        .bind(to_user_id.to_string())
        .bind(since.timestamp())
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows_to_lists(rows)
    }

    pub async fn get_shared_to_user_for_ids(
        &self,
        ids: &[Uuid],
        user_id: Uuid,
    ) -> Result<Vec<List>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT l.id, l.owner_id, l.name, l.is_template, \
                    l.created_at, l.updated_at, l.received_at, l.is_deleted \
             FROM lists AS l \
             JOIN shares AS s ON l.id = s.list_id AND l.owner_id = s.owner_id \
             WHERE l.id IN ({}) AND s.to_user_id = ?",
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, ListRow>(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows_to_lists(rows)
    }
}

pub async fn create_list(conn: &mut SqliteConnection, list: &List) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO lists (id, owner_id, name, is_template, created_at, updated_at, received_at, is_deleted) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(list.id.to_string())
    .bind(list.owner_id.to_string())
    .bind(&list.name)
    .bind(list.is_template)
    .bind(list.created_at.timestamp())
    .bind(list.updated_at.timestamp())
    .bind(list.received_at.timestamp())
    .bind(list.is_deleted)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn update_list(conn: &mut SqliteConnection, list: &List) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE lists SET name = ?, is_template = ?, created_at = ?, updated_at = ?, received_at = ?, is_deleted = ? \
         WHERE id = ? AND owner_id = ?",
    )
    .bind(&list.name)
    .bind(list.is_template)
    .bind(list.created_at.timestamp())
    .bind(list.updated_at.timestamp())
    .bind(list.received_at.timestamp())
    .bind(list.is_deleted)
    .bind(list.id.to_string())
    .bind(list.owner_id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use chrono::TimeZone;

    fn list(owner_id: Uuid, received_secs: i64) -> List {
        List {
            id: Uuid::new_v4(),
            owner_id,
            name: "Groceries".into(),
            is_template: false,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
            received_at: Utc.timestamp_opt(received_secs, 0).unwrap(),
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_scoped_by_owner() {
        let (pool, _dir) = test_pool().await;
        let repo = ListsReadRepository::new(pool.clone());

        let owner = Uuid::new_v4();
        let stored = list(owner, 1_700_000_200);

        let mut conn = pool.acquire().await.unwrap();
        create_list(&mut conn, &stored).await.unwrap();

        let found = repo.get_for_id_and_owner(stored.id, owner).await.unwrap();
        assert!(found.unwrap().is_equal(&stored));

        // Same id, wrong owner: not visible.
        let other = repo
            .get_for_id_and_owner(stored.id, Uuid::new_v4())
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_updated_for_owner_respects_watermark() {
        let (pool, _dir) = test_pool().await;
        let repo = ListsReadRepository::new(pool.clone());
        let owner = Uuid::new_v4();

        let old = list(owner, 100);
        let new = list(owner, 200);

        let mut conn = pool.acquire().await.unwrap();
        create_list(&mut conn, &old).await.unwrap();
        create_list(&mut conn, &new).await.unwrap();

        let updated = repo
            .get_updated_for_owner(owner, Utc.timestamp_opt(150, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id, new.id);

        // The boundary itself is included.
        let boundary = repo
            .get_updated_for_owner(owner, Utc.timestamp_opt(200, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(boundary.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete_cascades_to_items_and_shares() {
        let (pool, _dir) = test_pool().await;
        let owner = Uuid::new_v4();
        let mut stored = list(owner, 100);

        let mut conn = pool.acquire().await.unwrap();
        create_list(&mut conn, &stored).await.unwrap();

        sqlx::query(
            "INSERT INTO items (id, list_id, name, value, is_marked, created_at, updated_at, received_at, is_deleted) \
             VALUES (?, ?, 'Milk', '', 0, 1, 1, 1, 0)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(stored.id.to_string())
        .execute(&mut *conn)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO shares (id, list_id, owner_id, to_user_id, status, created_at, updated_at, received_at, is_deleted) \
             VALUES (?, ?, ?, ?, 1, 1, 1, 1, 0)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(stored.id.to_string())
        .bind(owner.to_string())
        .bind(Uuid::new_v4().to_string())
        .execute(&mut *conn)
        .await
        .unwrap();

        stored.is_deleted = true;
        stored.received_at = Utc.timestamp_opt(500, 0).unwrap();
        update_list(&mut conn, &stored).await.unwrap();

        let (item_deleted, item_received): (bool, i64) =
            sqlx::query_as("SELECT is_deleted, received_at FROM items WHERE list_id = ?")
                .bind(stored.id.to_string())
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert!(item_deleted);
        assert_eq!(item_received, 500);

        let (share_deleted,): (bool,) =
            sqlx::query_as("SELECT is_deleted FROM shares WHERE list_id = ?")
                .bind(stored.id.to_string())
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert!(share_deleted);
    }
}
