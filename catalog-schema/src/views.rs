//! JSON view documents returned by page routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub owner_user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ItemView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub owner_user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// `GET /`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexPage {
    pub user: Option<UserView>,
    pub categories: Vec<CategoryView>,
    pub latest_items: Vec<ItemView>,
}

/// `GET /catalog/{category}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryPage {
    pub category: CategoryView,
    pub items: Vec<ItemView>,
    /// Whether the requesting user may edit or delete this category.
    pub editable: bool,
}

/// `GET /catalog/{category}/{item}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemPage {
    pub category: CategoryView,
    pub item: ItemView,
    pub editable: bool,
}

/// `GET /login`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginPage {
    /// Anti-forgery token to pass back as `/gconnect?state=`.
    pub state: String,
    /// OAuth client id, absent when third-party sign-in is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Describes a form page: where it posts and which fields it takes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormView {
    pub action: String,
    pub fields: Vec<String>,
    /// Current values when editing or confirming a delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<serde_json::Value>,
    /// Selectable categories for item forms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryView>>,
}

impl FormView {
    pub fn new<I, S>(action: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action: action.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            current: None,
            categories: None,
        }
    }

    pub fn with_current<T: Serialize>(mut self, current: &T) -> Self {
        self.current = serde_json::to_value(current).ok();
        self
    }

    pub fn with_categories(mut self, categories: Vec<CategoryView>) -> Self {
        self.categories = Some(categories);
        self
    }
}
