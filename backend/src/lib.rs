use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;
pub mod validation;

use state::AppState;

/// Builds the full application router over `state`.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/openapi.json", get(docs::openapi_json))
        .route("/api/secure-auth/login", post(handlers::secure_auth::login))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login));

    let session_routes = Router::new()
        .route("/api/secure-auth/logout", post(handlers::secure_auth::logout))
        .route("/api/secure-auth/me", get(handlers::secure_auth::me))
        .route(
            "/api/secure-auth/extend-session",
            post(handlers::secure_auth::extend_session),
        )
        .route(
            "/api/secure-auth/sessions",
            get(handlers::secure_auth::list_sessions),
        )
        .route(
            "/api/secure-auth/sessions/{session_id}",
            delete(handlers::secure_auth::terminate_session),
        )
        .route(
            "/api/secure-auth/logout-all",
            post(handlers::secure_auth::logout_all),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::session_auth,
        ));

    let bearer_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/auth/change-password",
            put(handlers::auth::change_password),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::bearer_auth,
        ));

    let cors = cors_layer(&state.config.cors_allow_origins);

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(bearer_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum_middleware::from_fn(
                    middleware::logging::log_error_responses,
                )),
        )
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .max_age(std::time::Duration::from_secs(24 * 60 * 60));

    if allowed_origins.is_empty() {
        return base.allow_origin(Any).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    // Credentialed requests carry the session cookie, which wildcards forbid.
    base.allow_origin(AllowOrigin::list(origins))
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderName::from_static("x-session-id"),
            axum::http::HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}
