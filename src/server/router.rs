use crate::config::{Config, GoogleOauthResolvedConfig, MAX_SESSION_IDLE_TIMEOUT_SECS};
use crate::db::DbActorHandle;
use crate::error::CatalogError;
use crate::server::routes::{accounts, categories, items, oauth, pages};

use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use base64::Engine as _;
use rand::RngCore;
use reqwest::header::HeaderValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const CATALOG_USER_AGENT: &str = concat!("catalog/", env!("CARGO_PKG_VERSION"));

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct CatalogState {
    pub db: DbActorHandle,
    /// Shared client for every outbound provider call.
    pub http: reqwest::Client,
    /// `None` when no client secrets were loaded; `/gconnect` then answers 503.
    pub google: Option<Arc<GoogleOauthResolvedConfig>>,
    pub cookie_key: Key,
    pub session_idle_timeout: chrono::Duration,
    pub insecure_cookie: bool,
}

impl CatalogState {
    pub fn new(cfg: &Config, db: DbActorHandle) -> Result<Self, CatalogError> {
        let google = cfg.oauth.resolve().map(Arc::new);
        Self::with_google(cfg, db, google)
    }

    /// Like [`CatalogState::new`] with an explicit provider config instead of the secrets file.
    pub fn with_google(
        cfg: &Config,
        db: DbActorHandle,
        google: Option<Arc<GoogleOauthResolvedConfig>>,
    ) -> Result<Self, CatalogError> {
        cfg.validate().map_err(CatalogError::UnexpectedError)?;

        let cookie_key = Key::try_from(cfg.basic.session_secret.as_bytes())
            .map_err(|e| CatalogError::UnexpectedError(format!("invalid session secret: {e}")))?;

        let mut builder = reqwest::Client::builder()
            .user_agent(CATALOG_USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(cfg.oauth.connect_timeout())
            .timeout(cfg.oauth.request_timeout());
        if let Some(proxy_url) = cfg.oauth.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        let http = builder.build()?;

        let idle_secs = cfg
            .basic
            .session_idle_timeout_secs
            .min(MAX_SESSION_IDLE_TIMEOUT_SECS);
        let session_idle_timeout = chrono::Duration::try_seconds(idle_secs as i64)
            .unwrap_or(chrono::Duration::MAX);

        Ok(Self {
            db,
            http,
            google,
            cookie_key,
            session_idle_timeout,
            insecure_cookie: cfg.basic.insecure_cookie,
        })
    }

    pub fn secure_cookies(&self) -> bool {
        !self.insecure_cookie
    }
}

impl FromRef<CatalogState> for Key {
    fn from_ref(state: &CatalogState) -> Self {
        state.cookie_key.clone()
    }
}

async fn not_found_handler() -> Response {
    CatalogError::NotFound("The requested page does not exist.".to_string()).into_response()
}

async fn access_log(req: Request, next: Next) -> Response {
    // Capture request metadata before moving `req` into the handler stack.
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    // Always reflect `x-request-id`, even if the client didn't send one.
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let path = uri.path();
    let protocol = format_http_version(version);

    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    }

    resp
}

pub fn catalog_router(state: CatalogState) -> Router {
    let account = Router::new()
        .route(
            "/register",
            get(accounts::register_form).post(accounts::register),
        )
        .route("/login", get(oauth::login_page).post(accounts::login))
        .route("/logout", get(accounts::logout))
        .route("/gconnect", post(oauth::gconnect));

    // Static segments win over captures, so `categories/new` and `items/new` never reach
    // `{category}`; those two names are also refused as category names.
    let catalog = Router::new()
        .route(
            "/catalog/categories/new",
            get(categories::new_form).post(categories::create),
        )
        .route(
            "/catalog/items/new",
            get(items::new_form).post(items::create),
        )
        .route("/catalog/{category}", get(categories::show))
        .route(
            "/catalog/{category}/edit",
            get(categories::edit_form).post(categories::update),
        )
        .route(
            "/catalog/{category}/delete",
            get(categories::delete_form).post(categories::delete),
        )
        .route("/catalog/{category}/{item_id}", get(items::show))
        .route(
            "/catalog/{category}/{item_id}/edit",
            get(items::edit_form).post(items::update),
        )
        .route(
            "/catalog/{category}/{item_id}/delete",
            get(items::delete_form).post(items::delete),
        );

    Router::new()
        .route("/", get(pages::index))
        .route("/api/json", get(pages::export))
        .merge(account)
        .merge(catalog)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
