use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use catalog::config::Config;
use catalog::server::{CatalogState, catalog_router};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

const TEST_SECRET: &str =
    "test-session-secret-0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

fn unique_sqlite_path(prefix: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "catalog-{prefix}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    temp_path
}

async fn test_app(prefix: &str) -> Router {
    test_app_with(prefix, |_| {}).await
}

async fn test_app_with(prefix: &str, tweak: impl FnOnce(&mut Config)) -> Router {
    let db_path = unique_sqlite_path(prefix);
    let mut cfg = Config::default();
    cfg.basic.database_url = format!("sqlite:{}", db_path.display());
    cfg.basic.session_secret = TEST_SECRET.to_string();
    cfg.basic.insecure_cookie = true;
    tweak(&mut cfg);

    let db = catalog::db::spawn(&cfg.basic.database_url)
        .await
        .expect("spawn db actor");
    let state = CatalogState::with_google(&cfg, db, None).expect("build state");
    catalog_router(state)
}

fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

fn cookie_header_from_set_cookie_headers(headers: &axum::http::HeaderMap) -> String {
    let mut pairs: Vec<String> = Vec::new();
    for v in headers.get_all(header::SET_COOKIE).iter() {
        let s = v.to_str().expect("set-cookie header was not valid utf-8");
        let first = s.split(';').next().unwrap_or("");
        let mut parts = first.splitn(2, '=');
        let name = parts.next().unwrap_or("");
        let value = parts.next().unwrap_or("");
        if !name.trim().is_empty() && !value.is_empty() {
            pairs.push(format!("{}={}", name.trim(), value));
        }
    }
    pairs.join("; ")
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

const ALICE: &str = "username=alice&email=alice%40example.com&password=pw123&verify_password=pw123";

#[tokio::test]
async fn register_returns_created_user_and_rejects_duplicates() {
    let app = test_app("register").await;

    let resp = app
        .clone()
        .oneshot(form_request("/register", ALICE, None))
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password_hash").is_none());

    let resp = app
        .clone()
        .oneshot(form_request("/register", ALICE, None))
        .await
        .expect("duplicate register");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["message"], "Current username taken.");

    let resp = app
        .clone()
        .oneshot(form_request(
            "/register",
            "username=alice2&email=alice%40example.com&password=pw&verify_password=pw",
            None,
        ))
        .await
        .expect("duplicate email");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(
        json_body(resp).await["error"]["message"],
        "Current email taken."
    );
}

#[tokio::test]
async fn register_rejects_mismatched_and_blank_fields() {
    let app = test_app("register-invalid").await;

    let resp = app
        .clone()
        .oneshot(form_request(
            "/register",
            "username=bob&email=bob%40example.com&password=pw1&verify_password=pw2",
            None,
        ))
        .await
        .expect("mismatch");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(
        body["error"]["message"],
        "Password verification failed. Passwords must match"
    );

    let resp = app
        .clone()
        .oneshot(form_request("/register", "username=&email=", None))
        .await
        .expect("blank");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["error"]["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn login_sets_session_and_logout_ends_it() {
    let app = test_app("login").await;

    let resp = app
        .clone()
        .oneshot(form_request("/register", ALICE, None))
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Wrong password and unknown user look the same.
    for body in ["username=alice&password=nope", "username=mallory&password=pw123"] {
        let resp = app
            .clone()
            .oneshot(form_request("/login", body, None))
            .await
            .expect("bad login");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(json_body(resp).await["error"]["code"], "INVALID_CREDENTIALS");
    }

    let resp = app
        .clone()
        .oneshot(form_request("/login", "username=alice&password=pw123", None))
        .await
        .expect("login");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/");
    let cookie = cookie_header_from_set_cookie_headers(resp.headers());
    assert!(cookie.starts_with("catalog_session="), "cookie: {cookie}");

    let resp = app
        .clone()
        .oneshot(get_request("/", Some(&cookie)))
        .await
        .expect("index");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["user"]["username"], "alice");

    let resp = app
        .clone()
        .oneshot(get_request("/logout", Some(&cookie)))
        .await
        .expect("logout");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    // The old cookie no longer resolves to a session.
    let resp = app
        .clone()
        .oneshot(get_request("/", Some(&cookie)))
        .await
        .expect("index after logout");
    assert!(json_body(resp).await["user"].is_null());

    let resp = app
        .clone()
        .oneshot(get_request("/catalog/categories/new", Some(&cookie)))
        .await
        .expect("protected after logout");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"]["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn logout_without_session_just_redirects() {
    let app = test_app("logout-anon").await;
    let resp = app
        .oneshot(get_request("/logout", None))
        .await
        .expect("logout");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn forged_session_cookie_is_ignored() {
    let app = test_app("forged").await;
    let resp = app
        .oneshot(get_request(
            "/catalog/categories/new",
            Some("catalog_session=not-encrypted"),
        ))
        .await
        .expect("forged cookie");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn request_id_is_echoed_and_unknown_routes_use_the_envelope() {
    let app = test_app("misc").await;

    let req = Request::builder()
        .uri("/no/such/page/here")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .expect("request");
    let resp = app.clone().oneshot(req).await.expect("unknown route");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["x-request-id"], "req-123");
    assert_eq!(json_body(resp).await["error"]["code"], "NOT_FOUND");

    let resp = app
        .oneshot(get_request("/", None))
        .await
        .expect("index");
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn login_page_issues_state_and_cookie() {
    let app = test_app("login-page").await;
    let resp = app
        .oneshot(get_request("/login", None))
        .await
        .expect("login page");
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = cookie_header_from_set_cookie_headers(resp.headers());
    assert!(cookie.starts_with("oauth_state="), "cookie: {cookie}");
    let body = json_body(resp).await;
    assert!(!body["state"].as_str().unwrap_or_default().is_empty());
    assert!(body.get("client_id").is_none());
}

#[tokio::test]
async fn idle_sessions_expire() {
    let app = test_app_with("idle", |cfg| cfg.basic.session_idle_timeout_secs = 1).await;

    app.clone()
        .oneshot(form_request("/register", ALICE, None))
        .await
        .expect("register");
    let resp = app
        .clone()
        .oneshot(form_request("/login", "username=alice&password=pw123", None))
        .await
        .expect("login");
    let cookie = cookie_header_from_set_cookie_headers(resp.headers());

    let resp = app
        .clone()
        .oneshot(get_request("/catalog/categories/new", Some(&cookie)))
        .await
        .expect("fresh session");
    assert_eq!(resp.status(), StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    let resp = app
        .clone()
        .oneshot(get_request("/catalog/categories/new", Some(&cookie)))
        .await
        .expect("idle session");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"]["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn oversized_idle_timeout_is_refused_at_startup() {
    let db_path = unique_sqlite_path("idle-oversized");
    let mut cfg = Config::default();
    cfg.basic.database_url = format!("sqlite:{}", db_path.display());
    cfg.basic.session_secret = TEST_SECRET.to_string();
    cfg.basic.session_idle_timeout_secs = 10_000_000_000_000;

    let db = catalog::db::spawn(&cfg.basic.database_url)
        .await
        .expect("spawn db actor");
    assert!(CatalogState::with_google(&cfg, db, None).is_err());
}

#[tokio::test]
async fn emails_are_unique_regardless_of_case() {
    let app = test_app("email-case").await;

    let resp = app
        .clone()
        .oneshot(form_request(
            "/register",
            "username=alice&email=Alice%40Example.COM&password=pw123&verify_password=pw123",
            None,
        ))
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["email"], "alice@example.com");

    let resp = app
        .clone()
        .oneshot(form_request(
            "/register",
            "username=alice2&email=alice%40example.com&password=pw123&verify_password=pw123",
            None,
        ))
        .await
        .expect("case variant");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(
        json_body(resp).await["error"]["message"],
        "Current email taken."
    );
}
