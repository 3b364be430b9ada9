//! User profiles and the reduced projection handed to other users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::is_zero_timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub phone: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_activated: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl User {
    pub fn validate(&self) -> Result<(), String> {
        if self.phone <= 0 {
            return Err("phone is not set".into());
        }
        if self.name.chars().count() > 100 {
            return Err("name must be at most 100 characters".into());
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err("email format is wrong".into());
            }
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

/// What other users see of a profile: enough to render "shared by" and
/// invitation rows, nothing more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalUser {
    pub id: Uuid,
    pub phone: i64,
    pub is_activated: bool,
}

impl From<&User> for ExternalUser {
    fn from(user: &User) -> Self {
        ExternalUser {
            id: user.id,
            phone: user.phone,
            is_activated: user.is_activated,
        }
    }
}

/// A pull response returns the full profile only for the requesting
/// identity; everyone else is reduced to [`ExternalUser`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UserProjection {
    Own(User),
    External(ExternalUser),
}

impl UserProjection {
    pub fn id(&self) -> Uuid {
        match self {
            UserProjection::Own(user) => user.id,
            UserProjection::External(user) => user.id,
        }
    }
}
