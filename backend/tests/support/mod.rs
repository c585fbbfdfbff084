#![allow(dead_code)]

use std::sync::Arc;

use authkeeper_backend::{
    build_router,
    config::{Config, SessionBackend},
    db::connection::{create_memory_pool, run_migrations, DbPool},
    models::user::User,
    repositories::user as user_repo,
    services::session_store::{
        build_session_store_with_clock, DatabaseSessionStore, InMemorySessionStore, SessionStore,
    },
    state::AppState,
    utils::{clock::ManualClock, cookies::SameSite, password::hash_password},
};
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::Value;

pub const TEST_PASSWORD: &str = "correct horse battery";

pub fn test_config(backend: SessionBackend) -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        jwt_secret: "test-secret".into(),
        jwt_expiration_minutes: 30,
        session_backend: backend,
        session_ttl_minutes: 30,
        session_sweep_interval_minutes: 5,
        session_retention_days: 30,
        cookie_secure: false,
        cookie_same_site: SameSite::Lax,
        bind_addr: "127.0.0.1:0".into(),
        cors_allow_origins: Vec::new(),
    }
}

pub async fn test_pool() -> DbPool {
    let pool = create_memory_pool().await.expect("create sqlite pool");
    run_migrations(&pool).await.expect("run migrations");
    pool
}

pub async fn memory_store() -> (Arc<dyn SessionStore>, ManualClock) {
    let clock = ManualClock::default();
    let store = InMemorySessionStore::new(Arc::new(clock.clone()), Duration::minutes(5));
    (Arc::new(store), clock)
}

pub async fn database_store() -> (Arc<dyn SessionStore>, ManualClock) {
    let clock = ManualClock::default();
    let store = DatabaseSessionStore::new(test_pool().await, Arc::new(clock.clone()));
    (Arc::new(store), clock)
}

pub const BACKENDS: [SessionBackend; 2] = [SessionBackend::Memory, SessionBackend::Database];

pub async fn store_for(backend: SessionBackend) -> (Arc<dyn SessionStore>, ManualClock) {
    match backend {
        SessionBackend::Memory => memory_store().await,
        SessionBackend::Database => database_store().await,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: ManualClock,
}

pub async fn test_app(backend: SessionBackend) -> TestApp {
    let pool = test_pool().await;
    let config = test_config(backend);
    let clock = ManualClock::default();
    let sessions = build_session_store_with_clock(&config, pool.clone(), Arc::new(clock.clone()));
    let state = AppState::new(pool, config, sessions);
    TestApp {
        router: build_router(state.clone()),
        state,
        clock,
    }
}

pub async fn seed_user(pool: &DbPool, email: &str) -> User {
    let hash = hash_password(TEST_PASSWORD).expect("hash password");
    user_repo::insert_user(pool, "Test User", email, &hash)
        .await
        .expect("insert user")
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn session_request(
    method: &str,
    uri: &str,
    session_id: &str,
    body: Option<Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("session_id={}", session_id));
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    request.expect("build request")
}

pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

/// Value of the `session_id` cookie set by a response, if any.
pub fn set_cookie_session(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let first = cookie.split(';').next()?.trim();
            first.strip_prefix("session_id=").map(str::to_string)
        })
}

pub fn set_cookie_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
