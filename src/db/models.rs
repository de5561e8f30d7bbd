use catalog_schema::{CategoryView, ItemView, UserView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for DbUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("has_password", &self.password_hash.is_some())
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DbCategory {
    pub id: i64,
    pub name: String,
    pub owner_user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DbItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub owner_user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, PartialEq, FromRow)]
pub struct DbSession {
    pub id: String,
    pub user_id: i64,
    /// Identity provider name, `None` for local password logins.
    pub provider: Option<String>,
    pub provider_subject: Option<String>,
    pub provider_access_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl std::fmt::Debug for DbSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbSession")
            .field("id", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("provider_subject", &self.provider_subject)
            .field(
                "provider_access_token",
                &self.provider_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("last_seen_at", &self.last_seen_at)
            .finish()
    }
}

impl From<DbUser> for UserView {
    fn from(u: DbUser) -> Self {
        UserView {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}

impl From<DbCategory> for CategoryView {
    fn from(c: DbCategory) -> Self {
        CategoryView {
            id: c.id,
            name: c.name,
            owner_user_id: c.owner_user_id,
            created_at: c.created_at,
        }
    }
}

impl From<DbItem> for ItemView {
    fn from(i: DbItem) -> Self {
        ItemView {
            id: i.id,
            title: i.title,
            description: i.description,
            category_id: i.category_id,
            owner_user_id: i.owner_user_id,
            created_at: i.created_at,
        }
    }
}
