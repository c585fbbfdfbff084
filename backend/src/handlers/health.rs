use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{config::SessionBackend, error::AppError, state::AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[schema(value_type = String)]
    pub session_backend: SessionBackend,
    pub live_sessions: u64,
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let live_sessions = state.sessions.count_live().await?;
    Ok(Json(HealthResponse {
        status: "ok".into(),
        session_backend: state.config.session_backend,
        live_sessions,
    }))
}
