use crate::auth::{SESSION_COOKIE, Session};
use crate::error::CatalogError;
use crate::server::router::CatalogState;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Key, PrivateCookieJar};
use tracing::debug;

/// Session of the requesting user; rejects with `UNAUTHENTICATED` when there is none.
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

/// Session of the requesting user, if any. Never rejects on a missing or stale cookie.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

async fn resolve_session(
    parts: &mut Parts,
    state: &CatalogState,
) -> Result<Option<Session>, CatalogError> {
    let jar = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
        Ok(jar) => jar,
        Err(never) => match never {},
    };
    // Cookies that fail to decrypt are dropped by the jar and read as absent.
    let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return Ok(None);
    };

    match state
        .db
        .touch_session(session_id, state.session_idle_timeout)
        .await?
    {
        Some((session, user)) => Ok(Some(Session::from_rows(session, user))),
        None => {
            debug!("session cookie refers to an unknown or expired session");
            Ok(None)
        }
    }
}

impl FromRequestParts<CatalogState> for RequireSession {
    type Rejection = CatalogError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &CatalogState,
    ) -> Result<Self, Self::Rejection> {
        resolve_session(parts, state)
            .await?
            .map(RequireSession)
            .ok_or(CatalogError::Unauthenticated)
    }
}

impl FromRequestParts<CatalogState> for MaybeSession {
    type Rejection = CatalogError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &CatalogState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(resolve_session(parts, state).await?))
    }
}
