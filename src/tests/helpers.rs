use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header::SET_COOKIE},
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Once;
use tower::ServiceExt;
use tracing::{Level, info};
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::{Config, CookieConfig, GuardConfig, JwtConfig};
use crate::db;
use crate::models::role::Role;
use crate::models::user::User;
use crate::services::jwt_service::JwtService;
use crate::{AppState, create_router};

static INIT: Once = Once::new();

pub const TEST_PASSWORD: &str = "password123";

/// Initialize logging exactly once
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_target(false)
            .with_thread_ids(true)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::ERROR)
            .with_span_events(FmtSpan::NONE)
            .init();
    });
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        jwt: JwtConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
        },
        cookies: CookieConfig { secure: false },
        guard: GuardConfig::default(),
        bcrypt_cost: 4,
    }
}

pub fn test_jwt() -> JwtService {
    JwtService::new(&test_config().jwt).unwrap()
}

pub async fn setup_test_db() -> SqlitePool {
    init_tracing();
    info!("Setting up test database");
    db::create_memory_pool()
        .await
        .expect("Failed to create test database")
}

pub fn create_test_app(pool: SqlitePool) -> Router {
    create_router(AppState::new(pool, &test_config()).unwrap())
}

/// Insert a principal directly, bypassing signup (which only creates students).
pub async fn seed_user(pool: &SqlitePool, email: &str, role: Role) -> User {
    let hash = bcrypt::hash(TEST_PASSWORD, 4).unwrap();
    User::create(pool, "Test User", email, &hash, role)
        .await
        .expect("Failed to seed user")
}

pub async fn test_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: Option<HeaderMap>,
) -> (StatusCode, String, HeaderMap) {
    info!(method = %method, uri = %uri, "Making test request");

    let body = match body {
        Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
        None => Body::empty(),
    };

    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(custom_headers) = headers {
        for (key, value) in custom_headers.iter() {
            request = request.header(key, value);
        }
    }

    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = String::from_utf8(
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec(),
    )
    .unwrap();

    info!(status = %status, body = %body, "Test response received");
    (status, body, headers)
}

/// `name=value` of each `Set-Cookie` in `headers`.
pub fn set_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| cookie::Cookie::parse(v.to_owned()).ok())
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect()
}

pub fn set_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookies(headers)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

/// A request header map carrying the given cookies.
pub fn with_cookies(cookies: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    headers.insert("cookie", value.parse().unwrap());
    headers
}

/// Log in through the API and return the response headers.
pub async fn login(app: &Router, email: &str) -> HeaderMap {
    let (status, _, headers) = test_request(
        app.clone(),
        "POST",
        "/api/auth/login",
        Some(serde_json::json!({ "email": email, "password": TEST_PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    headers
}
