pub mod accounts;
pub mod categories;
pub mod items;
pub mod oauth;
pub mod pages;

use crate::error::CatalogError;
use axum::Form;
use axum::extract::rejection::FormRejection;

/// Unwrap a form body, reporting a malformed one through the error envelope.
fn form_body<T>(payload: Result<Form<T>, FormRejection>) -> Result<T, CatalogError> {
    payload
        .map(|Form(form)| form)
        .map_err(|e| CatalogError::Validation(format!("Malformed form body: {}", e.body_text())))
}

/// `/catalog/{segment}/...` with every segment percent-encoded.
fn catalog_path(segments: &[&str]) -> String {
    let mut path = String::from("/catalog");
    for segment in segments {
        path.push('/');
        path.extend(url::form_urlencoded::byte_serialize(segment.as_bytes()).map(|s| {
            // form encoding writes spaces as `+`, which is literal in a path.
            if s == "+" { "%20" } else { s }
        }));
    }
    path
}

/// Item ids in paths are numeric; anything else cannot name an item.
fn parse_item_id(raw: &str) -> Result<i64, CatalogError> {
    raw.parse()
        .map_err(|_| CatalogError::NotFound(format!("Item '{raw}' not found.")))
}
