#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use axum::Json;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    error::ErrorResponse,
    handlers::{
        health::HealthResponse,
        secure_auth::{
            ExtendSessionRequest, ExtendSessionResponse, LogoutAllResponse, SessionListResponse,
            SessionLoginResponse, SessionView,
        },
    },
    models::user::{ChangePasswordRequest, LoginRequest, RegisterRequest, TokenResponse, UserResponse},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        session_login_doc,
        session_logout_doc,
        session_me_doc,
        extend_session_doc,
        list_sessions_doc,
        terminate_session_doc,
        logout_all_doc,
        register_doc,
        token_login_doc,
        token_me_doc,
        change_password_doc,
        health_doc
    ),
    components(
        schemas(
            // sessions
            SessionLoginResponse,
            ExtendSessionRequest,
            ExtendSessionResponse,
            SessionView,
            SessionListResponse,
            LogoutAllResponse,
            // accounts & tokens
            RegisterRequest,
            LoginRequest,
            ChangePasswordRequest,
            TokenResponse,
            UserResponse,
            // misc
            HealthResponse,
            ErrorResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Sessions", description = "Cookie-based server-side sessions"),
        (name = "Auth", description = "Accounts and stateless bearer tokens"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());
        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("session_id"))),
        );
        components.add_security_scheme(
            "SessionHeader",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Session-ID"))),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/api/secure-auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created; `session_id` cookie set", body = SessionLoginResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    ),
    tag = "Sessions"
)]
fn session_login_doc() {}

#[utoipa::path(
    post,
    path = "/api/secure-auth/logout",
    responses(
        (status = 200, description = "Session revoked; cookie cleared", body = serde_json::Value),
        (status = 401, description = "No live session", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(("SessionCookie" = []), ("SessionHeader" = []))
)]
fn session_logout_doc() {}

#[utoipa::path(
    get,
    path = "/api/secure-auth/me",
    responses((status = 200, body = UserResponse)),
    tag = "Sessions",
    security(("SessionCookie" = []), ("SessionHeader" = []))
)]
fn session_me_doc() {}

#[utoipa::path(
    post,
    path = "/api/secure-auth/extend-session",
    request_body = ExtendSessionRequest,
    responses(
        (status = 200, body = ExtendSessionResponse),
        (status = 400, description = "Minutes must be between 5 and 480", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(("SessionCookie" = []), ("SessionHeader" = []))
)]
fn extend_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/secure-auth/sessions",
    responses((status = 200, body = SessionListResponse)),
    tag = "Sessions",
    security(("SessionCookie" = []), ("SessionHeader" = []))
)]
fn list_sessions_doc() {}

#[utoipa::path(
    delete,
    path = "/api/secure-auth/sessions/{session_id}",
    params(("session_id" = String, Path, description = "Another live session of the caller")),
    responses(
        (status = 200, body = serde_json::Value),
        (status = 400, description = "Target is the current session", body = ErrorResponse),
        (status = 404, description = "Not one of the caller's live sessions", body = ErrorResponse)
    ),
    tag = "Sessions",
    security(("SessionCookie" = []), ("SessionHeader" = []))
)]
fn terminate_session_doc() {}

#[utoipa::path(
    post,
    path = "/api/secure-auth/logout-all",
    responses((status = 200, body = LogoutAllResponse)),
    tag = "Sessions",
    security(("SessionCookie" = []), ("SessionHeader" = []))
)]
fn logout_all_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, body = UserResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "Auth"
)]
fn register_doc() {}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, body = TokenResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    ),
    tag = "Auth"
)]
fn token_login_doc() {}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses((status = 200, body = UserResponse)),
    tag = "Auth",
    security(("BearerAuth" = []))
)]
fn token_me_doc() {}

#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses((status = 200, body = serde_json::Value)),
    tag = "Auth",
    security(("BearerAuth" = []))
)]
fn change_password_doc() {}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, body = HealthResponse)),
    tag = "Health"
)]
fn health_doc() {}
