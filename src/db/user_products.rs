use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{from_unix, parse_uuid};
use crate::models::UserProduct;

#[derive(sqlx::FromRow)]
struct UserProductRow {
    id: String,
    owner_id: String,
    category_id: i64,
    global_product_id: i64,
    name: String,
    is_favorite: bool,
    created_at: i64,
    updated_at: i64,
    received_at: i64,
    is_deleted: bool,
}

impl UserProductRow {
    fn into_product(self) -> Result<UserProduct, sqlx::Error> {
        Ok(UserProduct {
            id: parse_uuid(&self.id)?,
            owner_id: parse_uuid(&self.owner_id)?,
            category_id: self.category_id,
            global_product_id: self.global_product_id,
            name: self.name,
            is_favorite: self.is_favorite,
            created_at: from_unix(self.created_at),
            updated_at: from_unix(self.updated_at),
            received_at: from_unix(self.received_at),
            is_deleted: self.is_deleted,
        })
    }
}

const SELECT_PRODUCT: &str =
    "SELECT id, owner_id, category_id, global_product_id, name, is_favorite, \
            created_at, updated_at, received_at, is_deleted \
     FROM user_products";

pub struct UserProductsReadRepository {
    pool: SqlitePool,
}

impl UserProductsReadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_updated_for_owner(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<UserProduct>, sqlx::Error> {
        let rows: Vec<UserProductRow> =
            sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE owner_id = ? AND received_at >= ?"))
                .bind(owner_id.to_string())
                .bind(since.timestamp())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(UserProductRow::into_product).collect()
    }
}

/// Transaction-bound lookup for the reconciliation pass.
pub async fn get_user_product(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<UserProduct>, sqlx::Error> {
    let row: Option<UserProductRow> =
        sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(conn)
            .await?;

    row.map(UserProductRow::into_product).transpose()
}

pub async fn create_user_product(
    conn: &mut SqliteConnection,
    product: &UserProduct,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_products (id, owner_id, category_id, global_product_id, name, is_favorite, \
                                    created_at, updated_at, received_at, is_deleted) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(product.id.to_string())
    .bind(product.owner_id.to_string())
    .bind(product.category_id)
    .bind(product.global_product_id)
    .bind(&product.name)
    .bind(product.is_favorite)
    .bind(product.created_at.timestamp())
    .bind(product.updated_at.timestamp())
    .bind(product.received_at.timestamp())
    .bind(product.is_deleted)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn update_user_product(
    conn: &mut SqliteConnection,
    product: &UserProduct,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE user_products SET category_id = ?, global_product_id = ?, name = ?, is_favorite = ?, \
                                  created_at = ?, updated_at = ?, received_at = ?, is_deleted = ? \
         WHERE id = ?",
    )
    .bind(product.category_id)
    .bind(product.global_product_id)
    .bind(&product.name)
    .bind(product.is_favorite)
    .bind(product.created_at.timestamp())
    .bind(product.updated_at.timestamp())
    .bind(product.received_at.timestamp())
    .bind(product.is_deleted)
    .bind(product.id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}
