//! Write payloads and lookup keys accepted by the database actor.
//!
//! Payloads are expected to be validated already (see `service::validation`); the actor only
//! enforces cross-row rules such as uniqueness and ownership.

use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
}

impl std::fmt::Debug for UserCreate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCreate")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Provider-verified identity to find or create a local user for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthUserUpsert {
    pub email: String,
    /// Display name; used to derive a username for new accounts.
    pub name: Option<String>,
    /// Whether an existing account with a local password may be signed into.
    pub link_existing_accounts: bool,
}

#[derive(Clone)]
pub struct SessionCreate {
    pub id: String,
    pub user_id: i64,
    pub provider: Option<String>,
    pub provider_subject: Option<String>,
    pub provider_access_token: Option<String>,
}

impl std::fmt::Debug for SessionCreate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCreate")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCreate {
    pub title: String,
    pub description: String,
    pub category_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

/// Identifies a category by id or by its unique name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryKey {
    Id(i64),
    Name(String),
}

/// Identifies an item, optionally within a category the caller expects it to belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemKey {
    pub id: i64,
    pub category: Option<CategoryKey>,
}

impl ItemKey {
    pub fn id(id: i64) -> Self {
        Self { id, category: None }
    }

    pub fn in_category(category_name: impl Into<String>, id: i64) -> Self {
        Self {
            id,
            category: Some(CategoryKey::Name(category_name.into())),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilter {
    pub category_id: Option<i64>,
    pub owner_user_id: Option<i64>,
    /// Most recent first when set; otherwise ordered by id.
    pub latest: Option<u32>,
}
