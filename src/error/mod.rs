mod catalog;
mod oauth;

pub use catalog::{ApiErrorBody, ApiErrorObject, CatalogError};
pub use oauth::OauthError;
