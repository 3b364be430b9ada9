use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{from_unix, parse_uuid, placeholders};
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    phone: i64,
    email: Option<String>,
    created_at: i64,
    updated_at: i64,
    is_activated: bool,
    is_deleted: bool,
}

impl UserRow {
    fn into_user(self) -> Result<User, sqlx::Error> {
        Ok(User {
            id: parse_uuid(&self.id)?,
            name: self.name,
            phone: self.phone,
            email: self.email,
            created_at: from_unix(self.created_at),
            updated_at: from_unix(self.updated_at),
            is_activated: self.is_activated,
            is_deleted: self.is_deleted,
        })
    }
}

const SELECT_USER: &str =
    "SELECT id, name, phone, email, created_at, updated_at, is_activated, is_deleted FROM users";

pub struct UsersReadRepository {
    pool: SqlitePool,
}

impl UsersReadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn get_users_for_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("{SELECT_USER} WHERE id IN ({})", placeholders(ids.len()));
        let mut query = sqlx::query_as::<_, UserRow>(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }
}

/// Self-profile update during a push. The phone number is the login
/// identity and never changes here; the orchestrator rejects attempts
/// before this is called.
pub async fn update_user(conn: &mut SqliteConnection, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET name = ?, email = ?, updated_at = ? WHERE id = ?")
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.updated_at.timestamp())
        .bind(user.id.to_string())
        .execute(conn)
        .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn insert_user(conn: &mut SqliteConnection, user: &User) {
    sqlx::query(
        "INSERT INTO users (id, name, phone, email, created_at, updated_at, is_activated, is_deleted) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id.to_string())
    .bind(&user.name)
    .bind(user.phone)
    .bind(&user.email)
    .bind(user.created_at.timestamp())
    .bind(user.updated_at.timestamp())
    .bind(user.is_activated)
    .bind(user.is_deleted)
    .execute(conn)
    .await
    .unwrap();
}
