use super::form_body;
use crate::auth::session::{SESSION_COOKIE, session_cookie, start_session};
use crate::error::CatalogError;
use crate::google_oauth::PROVIDER_GOOGLE;
use crate::google_oauth::endpoints::GoogleOauthEndpoints;
use crate::server::guards::MaybeSession;
use crate::server::router::CatalogState;
use crate::service::accounts;
use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar};
use catalog_schema::{FormView, LoginForm, RegisterForm, UserView};
use tracing::{info, warn};

/// GET /register
pub async fn register_form() -> Json<FormView> {
    Json(FormView::new(
        "/register",
        ["username", "email", "password", "verify_password"],
    ))
}

/// POST /register
///
/// Creates the account without signing it in.
pub async fn register(
    State(state): State<CatalogState>,
    payload: Result<Form<RegisterForm>, FormRejection>,
) -> Result<impl IntoResponse, CatalogError> {
    let form = form_body(payload)?;
    let user = accounts::register(&state.db, &form).await?;
    Ok((StatusCode::CREATED, Json(UserView::from(user))))
}

/// POST /login
pub async fn login(
    State(state): State<CatalogState>,
    MaybeSession(current): MaybeSession,
    jar: PrivateCookieJar,
    payload: Result<Form<LoginForm>, FormRejection>,
) -> Result<impl IntoResponse, CatalogError> {
    let form = form_body(payload)?;
    let user = accounts::authenticate(&state.db, &form).await?;

    if let Some(previous) = current {
        state.db.delete_session(previous.id).await?;
    }
    let session_id = start_session(&state.db, user.id, None).await?;
    info!(user_id = user.id, "local login succeeded");

    let jar = jar.add(session_cookie(session_id, state.secure_cookies()));
    Ok((jar, Redirect::to("/")))
}

/// GET /logout
///
/// Without a session this is just a redirect.
pub async fn logout(
    State(state): State<CatalogState>,
    MaybeSession(current): MaybeSession,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, CatalogError> {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    let Some(session) = current else {
        return Ok((jar, Redirect::to("/")));
    };

    state.db.delete_session(session.id.clone()).await?;
    info!(user_id = session.user_id(), "logged out");

    if let Some(link) = session.provider.as_ref().filter(|l| l.provider == PROVIDER_GOOGLE) {
        match state.google.as_deref() {
            Some(cfg) => {
                GoogleOauthEndpoints::revoke_token(cfg, &link.access_token, &state.http).await
            }
            None => warn!("provider session ended but sign-in is disabled; token not revoked"),
        }
    }

    Ok((jar, Redirect::to("/")))
}
