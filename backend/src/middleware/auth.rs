//! Request guards for the two authentication modes.
//!
//! Session routes resolve an opaque id (cookie `session_id`, or the
//! `X-Session-ID` header for tooling that cannot set cookies) through the
//! session store. Bearer routes verify a signed token and never touch the
//! store.
//!
//! A missing id is "unauthenticated"; unknown, expired and revoked ids all get
//! the same "invalid or expired" answer.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    services::session_store::{session_fingerprint, SessionStore},
    state::AppState,
    utils::{
        cookies::{extract_cookie_value, SESSION_COOKIE_NAME, SESSION_HEADER_NAME},
        jwt::{Claims, TokenIssuer},
    },
};

pub const UNAUTHENTICATED_MESSAGE: &str = "No session found. Please login.";
pub const INVALID_SESSION_MESSAGE: &str = "Invalid or expired session. Please login again.";
pub const INVALID_BEARER_MESSAGE: &str = "Could not validate credentials";
pub const SESSION_NOT_OWNED_MESSAGE: &str = "Session not found or doesn't belong to you";
pub const SELF_TERMINATION_MESSAGE: &str = "Cannot terminate current session. Use logout instead.";

/// The principal behind a live session, handed to session-authenticated handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSession {
    pub principal: String,
    pub session_id: String,
}

/// The principal behind a verified bearer token.
#[derive(Debug, Clone)]
pub struct BearerPrincipal {
    pub principal: String,
    pub claims: Claims,
}

pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_id = extract_session_id(request.headers());
    let current = authenticate_session(state.sessions.as_ref(), session_id.as_deref()).await?;
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

pub async fn bearer_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .map(str::to_owned);
    let principal = authenticate_bearer(&state.tokens, token.as_deref())?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Reads the session id from the cookie, falling back to the header.
pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| extract_cookie_value(raw, SESSION_COOKIE_NAME));
    from_cookie.or_else(|| {
        headers
            .get(SESSION_HEADER_NAME)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    })
}

pub async fn authenticate_session(
    store: &dyn SessionStore,
    session_id: Option<&str>,
) -> Result<CurrentSession, AppError> {
    let session_id = session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Unauthorized(UNAUTHENTICATED_MESSAGE.into()))?;

    let record = store.get(session_id).await?.ok_or_else(|| {
        tracing::debug!(
            session = %session_fingerprint(session_id),
            "Rejected unknown, expired or revoked session"
        );
        AppError::Unauthorized(INVALID_SESSION_MESSAGE.into())
    })?;

    Ok(CurrentSession {
        principal: record.principal,
        session_id: record.id,
    })
}

pub fn authenticate_bearer(
    issuer: &TokenIssuer,
    token: Option<&str>,
) -> Result<BearerPrincipal, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthorized(INVALID_BEARER_MESSAGE.into()))?;
    let claims = issuer.verify(token).map_err(|err| {
        tracing::debug!(error = %err, "Rejected bearer token");
        AppError::Unauthorized(INVALID_BEARER_MESSAGE.into())
    })?;
    Ok(BearerPrincipal {
        principal: claims.sub.clone(),
        claims,
    })
}

/// Guard for operations that target another session by id.
///
/// The acting principal was already authenticated from their own cookie or
/// header. The target must be one of their live sessions (anything else is
/// reported as not found, never as forbidden) and must not be the session
/// making the request; that one is ended through logout.
pub async fn authorize_session_target(
    store: &dyn SessionStore,
    acting: &CurrentSession,
    target_session_id: &str,
) -> Result<(), AppError> {
    let owned = store
        .list_by_principal(&acting.principal)
        .await?
        .iter()
        .any(|summary| summary.session_id == target_session_id);
    if !owned {
        return Err(AppError::NotFound(SESSION_NOT_OWNED_MESSAGE.into()));
    }

    if target_session_id == acting.session_id {
        return Err(AppError::BadRequest(SELF_TERMINATION_MESSAGE.into()));
    }

    Ok(())
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}
