use authkeeper_backend::config::SessionBackend;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod support;

use support::{
    json_request, response_json, seed_user, session_request, set_cookie_session, test_app,
    TestApp, TEST_PASSWORD,
};

fn bearer_request(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    request.unwrap()
}

async fn token_login(app: &TestApp, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap();
    let status = response.status();
    (status, response_json(response).await)
}

#[tokio::test]
async fn register_creates_account_and_rejects_duplicates() {
    let app = test_app(SessionBackend::Memory).await;
    let payload = json!({
        "name": "Alice",
        "email": "alice@example.com",
        "password": TEST_PASSWORD
    });

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/auth/register", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["name"], "Alice");
    assert!(body.get("password_hash").is_none());

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/auth/register", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_validates_payload() {
    let app = test_app(SessionBackend::Memory).await;
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({ "name": "  ", "email": "not-an-email", "password": "short" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let errors = body["details"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
}

#[tokio::test]
async fn malformed_bodies_get_a_json_bad_request() {
    let app = test_app(SessionBackend::Memory).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            json!({ "name": "Alice", "email": 42, "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["error"], "Invalid request body");

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/secure-auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn bearer_login_issues_token_accepted_by_me() {
    let app = test_app(SessionBackend::Memory).await;
    seed_user(&app.state.pool, "alice@example.com").await;

    let (status, body) = token_login(&app, "alice@example.com", TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 1800);
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["email"], "alice@example.com");

    // Bearer login never creates a server-side session.
    assert_eq!(app.state.sessions.count_live().await.unwrap(), 0);
}

#[tokio::test]
async fn bearer_login_rejects_bad_credentials() {
    let app = test_app(SessionBackend::Memory).await;
    seed_user(&app.state.pool, "alice@example.com").await;

    let (status, body) = token_login(&app, "alice@example.com", "nope-nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, _) = token_login(&app, "ghost@example.com", TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_routes_reject_missing_or_forged_tokens() {
    let app = test_app(SessionBackend::Memory).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (forged, _) = authkeeper_backend::utils::jwt::TokenIssuer::new(
        "another-secret",
        chrono::Duration::minutes(30),
    )
    .issue("alice@example.com")
    .unwrap();
    let response = app
        .router
        .clone()
        .oneshot(bearer_request("GET", "/api/auth/me", &forged, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_tokens_and_bearer_tokens_are_not_interchangeable() {
    let app = test_app(SessionBackend::Memory).await;
    seed_user(&app.state.pool, "alice@example.com").await;
    let (_, body) = token_login(&app, "alice@example.com", TEST_PASSWORD).await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(session_request("GET", "/api/secure-auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoking_sessions_leaves_bearer_tokens_valid() {
    let app = test_app(SessionBackend::Database).await;
    seed_user(&app.state.pool, "alice@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/secure-auth/login",
            json!({ "email": "alice@example.com", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();
    let session_id = set_cookie_session(&response).expect("session cookie");
    let (_, body) = token_login(&app, "alice@example.com", TEST_PASSWORD).await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(session_request("POST", "/api/secure-auth/logout-all", &session_id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(bearer_request("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn change_password_requires_current_password() {
    let app = test_app(SessionBackend::Memory).await;
    seed_user(&app.state.pool, "alice@example.com").await;
    let (_, body) = token_login(&app, "alice@example.com", TEST_PASSWORD).await;
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(bearer_request(
            "PUT",
            "/api/auth/change-password",
            &token,
            Some(json!({ "current_password": "not-it", "new_password": "a-new-password" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(bearer_request(
            "PUT",
            "/api/auth/change-password",
            &token,
            Some(json!({ "current_password": TEST_PASSWORD, "new_password": "a-new-password" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = token_login(&app, "alice@example.com", TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = token_login(&app, "alice@example.com", "a-new-password").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_request_id_and_openapi_is_served() {
    let app = test_app(SessionBackend::Memory).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/openapi.json")
                .header("x-request-id", "trace-me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-me");
    let body = response_json(response).await;
    assert!(body["paths"]["/api/secure-auth/extend-session"].is_object());
}
