//! Bearer-token account routes under `/api/auth`.
//!
//! Tokens issued here are stateless: they are never looked up in the session
//! store, so logging out of a session leaves them valid until their own expiry.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    middleware::auth::BearerPrincipal,
    models::user::{
        ChangePasswordRequest, LoginRequest, RegisterRequest, TokenResponse, User, UserResponse,
    },
    repositories::user as user_repo,
    state::AppState,
    utils::password::{hash_password, verify_password},
};

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    if user_repo::email_exists(&state.pool, &payload.email).await? {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = user_repo::insert_user(&state.pool, &payload.name, &payload.email, &password_hash)
        .await
        .map_err(|err| {
            if user_repo::is_unique_violation(&err) {
                AppError::Conflict("Email already registered".into())
            } else {
                AppError::from(err)
            }
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, "Registered user");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(payload) = payload?;
    let user = verify_credentials(&state.pool, &payload).await?;

    let (access_token, claims) = state.tokens.issue(&user.email)?;
    tracing::info!(email = %user.email, "Issued bearer token");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
        expires_in: claims.exp - claims.iat,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<BearerPrincipal>,
) -> Result<Json<UserResponse>, AppError> {
    let user = load_user(&state.pool, &principal.principal).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Replaces the password digest. Outstanding tokens and sessions are not
/// revoked.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<BearerPrincipal>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let user = load_user(&state.pool, &principal.principal).await?;
    if !verify_password(&payload.current_password, &user.password_hash) {
        return Err(AppError::BadRequest("Invalid current password".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    if !user_repo::update_password_hash(&state.pool, &user.id, &new_hash).await? {
        return Err(AppError::NotFound("User not found".into()));
    }

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// Shared by both login routes. Unknown email and wrong password are
/// indistinguishable to the caller.
pub(crate) async fn verify_credentials(
    pool: &SqlitePool,
    payload: &LoginRequest,
) -> Result<User, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.into()))?;

    let Some(user) = user_repo::find_user_by_email(pool, &payload.email).await? else {
        tracing::debug!("Login attempt for unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.into()));
    };

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.into()));
    }

    Ok(user)
}

pub(crate) async fn load_user(pool: &SqlitePool, email: &str) -> Result<User, AppError> {
    user_repo::find_user_by_email(pool, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
