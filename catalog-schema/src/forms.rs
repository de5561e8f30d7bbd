//! `application/x-www-form-urlencoded` request bodies.
//!
//! Every field defaults to empty so that a missing field surfaces as a validation
//! failure in the handler instead of a body rejection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(alias = "verifyPassword")]
    pub verify_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryForm {
    pub name: String,
}

/// Item create/edit form.
///
/// `category_id` is kept as text: browsers submit an empty string for an unselected
/// `<select>`, which must be reported as a validation error rather than a 422.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ItemForm {
    pub title: String,
    pub description: String,
    pub category_id: String,
}

impl ItemForm {
    /// Parsed `category_id`, `None` when blank or not a number.
    pub fn category_id(&self) -> Option<i64> {
        self.category_id.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_form_accepts_legacy_field_name() {
        let form: RegisterForm = serde_json::from_value(serde_json::json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "pw123",
            "verifyPassword": "pw123",
        }))
        .expect("form deserializes");
        assert_eq!(form.verify_password, "pw123");
    }

    #[test]
    fn item_form_category_id_parses_or_none() {
        let mut form = ItemForm {
            category_id: " 7 ".to_string(),
            ..Default::default()
        };
        assert_eq!(form.category_id(), Some(7));

        form.category_id = String::new();
        assert_eq!(form.category_id(), None);

        form.category_id = "books".to_string();
        assert_eq!(form.category_id(), None);
    }
}
