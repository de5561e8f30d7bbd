use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::error;

use super::oauth::OauthError;

#[derive(Debug, ThisError)]
pub enum CatalogError {
    /// A required field is blank or malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Duplicate username/email/category name, or a state transition the data forbids.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Username and password combination invalid")]
    InvalidCredentials,

    /// The route needs a session and the request has none.
    #[error("Authentication required")]
    Unauthenticated,

    /// The session user does not own the record being changed.
    #[error("Only the owner may modify this record")]
    NotOwner,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Oauth(#[from] OauthError),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        // Uniqueness is checked before every write; the constraint only fires on a race.
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return CatalogError::Conflict("Record already exists".to_string());
            }
        }
        CatalogError::DatabaseError(e)
    }
}

impl CatalogError {
    /// HTTP status and stable machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            CatalogError::Validation(_) => (StatusCode::CONFLICT, "VALIDATION_FAILED"),
            CatalogError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            CatalogError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            CatalogError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            CatalogError::NotOwner => (StatusCode::UNAUTHORIZED, "NOT_OWNER"),
            CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),

            CatalogError::Oauth(OauthError::StateMismatch) => {
                (StatusCode::UNAUTHORIZED, "STATE_MISMATCH")
            }
            CatalogError::Oauth(OauthError::Disabled) => {
                (StatusCode::SERVICE_UNAVAILABLE, "OAUTH_DISABLED")
            }
            CatalogError::Oauth(
                OauthError::Exchange { .. }
                | OauthError::ServerResponse { .. }
                | OauthError::Parse { .. },
            ) => (StatusCode::UNAUTHORIZED, "EXCHANGE_FAILED"),
            CatalogError::Oauth(OauthError::TokenMismatch { .. }) => {
                (StatusCode::UNAUTHORIZED, "TOKEN_MISMATCH")
            }
            CatalogError::Oauth(OauthError::Request(_) | OauthError::UpstreamStatus(_))
            | CatalogError::ReqwestError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),

            CatalogError::Oauth(OauthError::Other { .. })
            | CatalogError::JsonError(_)
            | CatalogError::IoError(_)
            | CatalogError::UrlError(_)
            | CatalogError::PasswordHash(_)
            | CatalogError::UnexpectedError(_)
            | CatalogError::RactorError(_)
            | CatalogError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    /// Message safe to show to the client. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            CatalogError::Validation(msg)
            | CatalogError::Conflict(msg)
            | CatalogError::NotFound(msg) => msg.clone(),
            CatalogError::InvalidCredentials
            | CatalogError::Unauthenticated
            | CatalogError::NotOwner => self.to_string(),
            CatalogError::Oauth(OauthError::StateMismatch) => "Invalid state parameter.".to_string(),
            CatalogError::Oauth(OauthError::Disabled) => {
                "Third-party sign-in is not available.".to_string()
            }
            CatalogError::Oauth(
                OauthError::Exchange { .. }
                | OauthError::ServerResponse { .. }
                | OauthError::Parse { .. },
            ) => "Failed to upgrade the authorization code.".to_string(),
            CatalogError::Oauth(OauthError::TokenMismatch { message }) => message.clone(),
            CatalogError::Oauth(OauthError::Request(_) | OauthError::UpstreamStatus(_))
            | CatalogError::ReqwestError(_) => "Upstream service error.".to_string(),
            _ => "An internal server error occurred.".to_string(),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, code, "request failed");
        }
        let body = ApiErrorObject {
            code: code.to_string(),
            message: self.public_message(),
        };
        (status, Json(ApiErrorBody { inner: body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
