//! Field-level validation of submitted forms.
//!
//! Everything here is pure; cross-row rules (uniqueness, ownership, foreign keys) are enforced by
//! the database actor inside the write transaction.

use crate::db::{CategoryCreate, CategoryPatch, ItemCreate, ItemPatch};
use crate::error::CatalogError;
use catalog_schema::{CategoryForm, ItemForm, RegisterForm};

pub const MAX_NAME_LEN: usize = 32;

/// Path segments under `/catalog/` that are routes, not category names.
pub const RESERVED_CATEGORY_NAMES: [&str; 2] = ["items", "categories"];

/// Trimmed, non-blank value no longer than `max_len` characters.
pub fn required(field: &str, value: &str, max_len: usize) -> Result<String, CatalogError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::Validation(format!("{field} is required.")));
    }
    if value.chars().count() > max_len {
        return Err(CatalogError::Validation(format!(
            "{field} must be at most {max_len} characters."
        )));
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub fn registration(form: &RegisterForm) -> Result<Registration, CatalogError> {
    let username = required("Username", &form.username, MAX_NAME_LEN)?;
    let email = required("Email", &form.email, 254)?.to_lowercase();
    if !email.contains('@') {
        return Err(CatalogError::Validation(
            "Email must be a valid address.".to_string(),
        ));
    }
    if form.password.is_empty() {
        return Err(CatalogError::Validation("Password is required.".to_string()));
    }
    if form.password != form.verify_password {
        return Err(CatalogError::Conflict(
            "Password verification failed. Passwords must match".to_string(),
        ));
    }
    Ok(Registration {
        username,
        email,
        password: form.password.clone(),
    })
}

pub fn category_name(raw: &str) -> Result<String, CatalogError> {
    let name = required("Category name", raw, MAX_NAME_LEN)?;
    if RESERVED_CATEGORY_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(&name))
    {
        return Err(CatalogError::Validation(format!(
            "'{name}' is reserved and cannot be used as a category name."
        )));
    }
    if name.contains('/') {
        return Err(CatalogError::Validation(
            "Category name cannot contain '/'.".to_string(),
        ));
    }
    Ok(name)
}

pub fn category_create(form: &CategoryForm) -> Result<CategoryCreate, CatalogError> {
    Ok(CategoryCreate {
        name: category_name(&form.name)?,
    })
}

pub fn category_patch(form: &CategoryForm) -> Result<CategoryPatch, CatalogError> {
    Ok(CategoryPatch {
        name: Some(category_name(&form.name)?),
    })
}

pub fn item_create(form: &ItemForm) -> Result<ItemCreate, CatalogError> {
    let title = required("Title", &form.title, MAX_NAME_LEN)?;
    let category_id = form
        .category_id()
        .ok_or_else(|| CatalogError::Validation("Category is required.".to_string()))?;
    Ok(ItemCreate {
        title,
        description: form.description.trim().to_string(),
        category_id,
    })
}

/// Title is required on edit; a blank category keeps the current one.
pub fn item_patch(form: &ItemForm) -> Result<ItemPatch, CatalogError> {
    let title = required("Title", &form.title, MAX_NAME_LEN)?;
    let category_id = if form.category_id.trim().is_empty() {
        None
    } else {
        Some(form.category_id().ok_or_else(|| {
            CatalogError::Validation("Category must be a numeric id.".to_string())
        })?)
    };
    Ok(ItemPatch {
        title: Some(title),
        description: Some(form.description.trim().to_string()),
        category_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_form(username: &str, email: &str, pw: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            email: email.to_string(),
            password: pw.to_string(),
            verify_password: confirm.to_string(),
        }
    }

    #[test]
    fn registration_trims_and_accepts() {
        let reg = registration(&register_form(" alice ", "alice@x.com", "pw123", "pw123"))
            .expect("valid registration");
        assert_eq!(reg.username, "alice");
        assert_eq!(reg.email, "alice@x.com");

        let reg = registration(&register_form("alice", " Alice@X.com ", "pw123", "pw123"))
            .expect("valid registration");
        assert_eq!(reg.email, "alice@x.com");
    }

    #[test]
    fn registration_password_mismatch_is_conflict() {
        let err = registration(&register_form("alice", "alice@x.com", "pw123", "pw124"))
            .expect_err("mismatch rejected");
        assert!(matches!(err, CatalogError::Conflict(_)));
    }

    #[test]
    fn registration_blank_fields_are_validation_errors() {
        for form in [
            register_form("", "a@x.com", "pw", "pw"),
            register_form("alice", "  ", "pw", "pw"),
            register_form("alice", "not-an-email", "pw", "pw"),
            register_form("alice", "a@x.com", "", ""),
        ] {
            let err = registration(&form).expect_err("blank rejected");
            assert!(matches!(err, CatalogError::Validation(_)), "{err:?}");
        }
    }

    #[test]
    fn category_names_are_bounded_and_not_reserved() {
        assert_eq!(category_name("  Books ").expect("valid"), "Books");
        assert!(category_name("").is_err());
        assert!(category_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
        assert!(category_name("Items").is_err());
        assert!(category_name("a/b").is_err());
    }

    #[test]
    fn item_create_requires_title_and_category() {
        let mut form = ItemForm {
            title: "Dune".to_string(),
            description: "  spice  ".to_string(),
            category_id: "3".to_string(),
        };
        let create = item_create(&form).expect("valid item");
        assert_eq!(create.category_id, 3);
        assert_eq!(create.description, "spice");

        form.category_id = String::new();
        assert!(matches!(
            item_create(&form),
            Err(CatalogError::Validation(_))
        ));

        form.category_id = "3".to_string();
        form.title = " ".to_string();
        assert!(matches!(
            item_create(&form),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn item_patch_keeps_category_when_blank() {
        let form = ItemForm {
            title: "Dune".to_string(),
            description: String::new(),
            category_id: String::new(),
        };
        let patch = item_patch(&form).expect("valid patch");
        assert_eq!(patch.category_id, None);
        assert_eq!(patch.title.as_deref(), Some("Dune"));
    }
}
