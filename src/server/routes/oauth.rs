use crate::auth::session::session_cookie;
use crate::google_oauth::{ConnectOutcome, GoogleConnect};
use crate::server::guards::MaybeSession;
use crate::server::router::CatalogState;
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use catalog_schema::{LoginPage, UserView};
use oauth2::CsrfToken;
use serde::{Deserialize, Serialize};
use time::Duration;

const STATE_COOKIE: &str = "oauth_state";

#[derive(Debug, Deserialize)]
pub struct GconnectQuery {
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GconnectResponse {
    #[serde(flatten)]
    pub user: UserView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /login
///
/// Issues a fresh anti-forgery state; the client echoes it back on `/gconnect`.
pub async fn login_page(
    State(state): State<CatalogState>,
    jar: PrivateCookieJar,
) -> impl IntoResponse {
    let token = CsrfToken::new_random();
    let jar = jar.add(build_state_cookie(
        token.secret().to_string(),
        state.secure_cookies(),
    ));
    let page = LoginPage {
        state: token.secret().to_string(),
        client_id: state.google.as_ref().map(|g| g.client_id.clone()),
    };
    (jar, Json(page))
}

/// POST /gconnect?state=…
///
/// Body is the raw one-time authorization code.
pub async fn gconnect(
    State(state): State<CatalogState>,
    Query(query): Query<GconnectQuery>,
    MaybeSession(current): MaybeSession,
    jar: PrivateCookieJar,
    code: String,
) -> Response {
    // The state is single-use whatever the outcome.
    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/"));

    let result = GoogleConnect {
        google: state.google.as_deref(),
        http: &state.http,
        db: &state.db,
        expected_state: expected.as_deref(),
        received_state: query.state.as_deref(),
        current: current.as_ref(),
    }
    .connect(code)
    .await;

    match result {
        Ok(ConnectOutcome::AlreadyConnected(user)) => {
            let body = GconnectResponse {
                user: user.into(),
                message: Some("Current user is already connected.".to_string()),
            };
            (jar, Json(body)).into_response()
        }
        Ok(ConnectOutcome::Connected { user, session_id }) => {
            let jar = jar.add(session_cookie(session_id, state.secure_cookies()));
            let body = GconnectResponse {
                user: user.into(),
                message: None,
            };
            (jar, Json(body)).into_response()
        }
        Err(err) => (jar, err).into_response(),
    }
}

fn build_state_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}
