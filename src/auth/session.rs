use crate::db::{DbActorHandle, DbSession, DbUser, SessionCreate};
use crate::error::CatalogError;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine as _;
use rand::RngCore;

/// Name of the private cookie carrying the opaque session id.
pub const SESSION_COOKIE: &str = "catalog_session";

/// Provider identity attached to a session created through third-party sign-in.
#[derive(Clone)]
pub struct ProviderLink {
    pub provider: String,
    pub subject: String,
    pub access_token: String,
}

impl std::fmt::Debug for ProviderLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderLink")
            .field("provider", &self.provider)
            .field("subject", &self.subject)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Per-request authentication context, resolved from the session cookie.
#[derive(Clone)]
pub struct Session {
    pub id: String,
    pub user: DbUser,
    pub provider: Option<ProviderLink>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user.id)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub(crate) fn from_rows(session: DbSession, user: DbUser) -> Self {
        let provider = match (
            session.provider,
            session.provider_subject,
            session.provider_access_token,
        ) {
            (Some(provider), Some(subject), Some(access_token)) => Some(ProviderLink {
                provider,
                subject,
                access_token,
            }),
            _ => None,
        };
        Self {
            id: session.id,
            user,
            provider,
        }
    }
}

fn new_session_id() -> String {
    // 256 bits => 43 chars base64url (no padding).
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Persist a new session for `user_id` and return its id.
pub async fn start_session(
    db: &DbActorHandle,
    user_id: i64,
    provider: Option<ProviderLink>,
) -> Result<String, CatalogError> {
    let (provider, provider_subject, provider_access_token) = match provider {
        Some(link) => (
            Some(link.provider),
            Some(link.subject),
            Some(link.access_token),
        ),
        None => (None, None, None),
    };
    let session = db
        .create_session(SessionCreate {
            id: new_session_id(),
            user_id,
            provider,
            provider_subject,
            provider_access_token,
        })
        .await?;
    Ok(session.id)
}

/// Browser-session cookie (no max-age); expiry is enforced server-side.
pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique_and_url_safe() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("abc".to_string(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
