//! Cookie-session routes under `/api/secure-auth`.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::header::SET_COOKIE,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    handlers::auth::{load_user, verify_credentials},
    middleware::auth::{
        authorize_session_target, CurrentSession, INVALID_SESSION_MESSAGE,
        SESSION_NOT_OWNED_MESSAGE,
    },
    models::{
        session::SessionSummary,
        user::{LoginRequest, UserResponse},
    },
    services::session_store::session_fingerprint,
    state::AppState,
    utils::cookies::{build_clear_session_cookie, build_session_cookie},
    validation::rules::{
        extend_minutes_range_message, validate_extend_minutes, DEFAULT_EXTEND_MINUTES,
    },
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionLoginResponse {
    pub message: String,
    pub user: UserResponse,
    /// Seconds until the new session expires.
    pub session_expires_in: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendSessionRequest {
    #[serde(default = "default_extend_minutes")]
    pub minutes: i64,
}

fn default_extend_minutes() -> i64 {
    DEFAULT_EXTEND_MINUTES
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExtendSessionResponse {
    pub message: String,
    pub extended_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionView {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_current: bool,
}

impl SessionView {
    fn from_summary(summary: SessionSummary, current_session_id: &str) -> Self {
        let is_current = summary.session_id == current_session_id;
        Self {
            session_id: summary.session_id,
            created_at: summary.created_at,
            last_accessed_at: summary.last_accessed_at,
            expires_at: summary.expires_at,
            is_current,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    pub active_sessions: usize,
    pub sessions: Vec<SessionView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutAllResponse {
    pub message: String,
    pub terminated_sessions: u64,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let user = verify_credentials(&state.pool, &payload).await?;

    let ttl = state.config.session_ttl();
    let session_id = state.sessions.create(&user.email, Some(ttl)).await?;
    let cookie = build_session_cookie(
        &session_id,
        std::time::Duration::from_secs(ttl.num_seconds().max(0) as u64),
        state.config.cookie_options(),
    );

    tracing::info!(
        email = %user.email,
        session = %session_fingerprint(&session_id),
        "Session login"
    );

    let body = SessionLoginResponse {
        message: "Login successful".into(),
        user: UserResponse::from(user),
        session_expires_in: ttl.num_seconds(),
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.revoke(&current.session_id).await?;
    tracing::info!(email = %current.principal, "Session logout");

    let cookie = build_clear_session_cookie(state.config.cookie_options());
    Ok((
        [(SET_COOKIE, cookie)],
        Json(json!({ "message": "Logout successful" })),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<UserResponse>, AppError> {
    let user = load_user(&state.pool, &current.principal).await?;
    Ok(Json(UserResponse::from(user)))
}

/// A session that lapsed after the guard ran answers 401, the same as the guard.
pub async fn extend_session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    payload: Result<Json<ExtendSessionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|rejection| match rejection {
        // `minutes` present but not an integer.
        JsonRejection::JsonDataError(_) => AppError::BadRequest(extend_minutes_range_message()),
        other => AppError::from(other),
    })?;
    let minutes = payload.minutes;
    validate_extend_minutes(minutes)
        .map_err(|_| AppError::BadRequest(extend_minutes_range_message()))?;

    // The session can lapse between the guard and this call.
    if !state.sessions.extend(&current.session_id, minutes).await? {
        return Err(AppError::Unauthorized(INVALID_SESSION_MESSAGE.into()));
    }

    tracing::info!(
        email = %current.principal,
        session = %session_fingerprint(&current.session_id),
        minutes,
        "Session extended"
    );

    let cookie = build_session_cookie(
        &current.session_id,
        std::time::Duration::from_secs(minutes as u64 * 60),
        state.config.cookie_options(),
    );
    let body = ExtendSessionResponse {
        message: format!("Session extended by {} minutes", minutes),
        extended_minutes: minutes,
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<SessionListResponse>, AppError> {
    let sessions: Vec<SessionView> = state
        .sessions
        .list_by_principal(&current.principal)
        .await?
        .into_iter()
        .map(|summary| SessionView::from_summary(summary, &current.session_id))
        .collect();

    Ok(Json(SessionListResponse {
        active_sessions: sessions.len(),
        sessions,
    }))
}

pub async fn terminate_session(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    authorize_session_target(state.sessions.as_ref(), &current, &session_id).await?;

    // Lost a race with expiry or another revocation.
    if !state.sessions.revoke(&session_id).await? {
        return Err(AppError::NotFound(SESSION_NOT_OWNED_MESSAGE.into()));
    }

    tracing::info!(
        email = %current.principal,
        session = %session_fingerprint(&session_id),
        "Session terminated by owner"
    );
    Ok(Json(json!({ "message": "Session terminated successfully" })))
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<impl IntoResponse, AppError> {
    let terminated = state
        .sessions
        .revoke_all_by_principal(&current.principal)
        .await?;
    tracing::info!(
        email = %current.principal,
        terminated,
        "Logged out from all devices"
    );

    let cookie = build_clear_session_cookie(state.config.cookie_options());
    let body = LogoutAllResponse {
        message: "Successfully logged out from all devices".into(),
        terminated_sessions: terminated,
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_view_flags_current_session() {
        let now = Utc::now();
        let summary = SessionSummary {
            session_id: "abc".into(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now,
        };
        assert!(SessionView::from_summary(summary.clone(), "abc").is_current);
        assert!(!SessionView::from_summary(summary, "other").is_current);
    }

    #[test]
    fn extend_request_defaults_to_thirty_minutes() {
        let payload: ExtendSessionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.minutes, 30);
        let payload: ExtendSessionRequest = serde_json::from_str(r#"{"minutes": 90}"#).unwrap();
        assert_eq!(payload.minutes, 90);
    }
}
