//! Server-side session storage.
//!
//! [`SessionStore`] is the contract every backend honours:
//!
//! - a record is live iff `active && now < expires_at`, evaluated on every access;
//! - lookups of a dead record mark it inactive and report it absent;
//! - `extend` never resurrects a dead record;
//! - `revoke` reports `true` at most once per id.
//!
//! Two backends implement it: [`InMemorySessionStore`] (volatile, sharded,
//! time-gated reclamation) and [`DatabaseSessionStore`] (durable, reclaims on
//! every create). [`build_session_store`] picks one from configuration.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

use crate::{
    config::{Config, SessionBackend},
    db::connection::DbPool,
    models::session::{SessionRecord, SessionSummary},
    utils::clock::{Clock, SystemClock},
};

pub mod database;
pub mod memory;

pub use database::DatabaseSessionStore;
pub use memory::InMemorySessionStore;

/// Lifetime given to a session when the caller does not name one.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

pub fn default_session_ttl() -> Duration {
    Duration::minutes(DEFAULT_SESSION_TTL_MINUTES)
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session storage failure: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("session record is corrupt: {0}")]
    Corrupt(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a live record for `principal` and returns its fresh id.
    /// `ttl` defaults to [`default_session_ttl`].
    async fn create(
        &self,
        principal: &str,
        ttl: Option<Duration>,
    ) -> Result<String, SessionStoreError>;

    /// Returns the record if live, touching `last_accessed_at`.
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Sets `expires_at = now + minutes` on a live record.
    async fn extend(&self, session_id: &str, minutes: i64) -> Result<bool, SessionStoreError>;

    /// Marks the record inactive; `true` only if it was active.
    async fn revoke(&self, session_id: &str) -> Result<bool, SessionStoreError>;

    /// Live sessions of `principal`, most recently used first.
    async fn list_by_principal(
        &self,
        principal: &str,
    ) -> Result<Vec<SessionSummary>, SessionStoreError>;

    /// Revokes every live session of `principal`, returning how many.
    async fn revoke_all_by_principal(&self, principal: &str) -> Result<u64, SessionStoreError>;

    /// Marks expired-but-active records inactive, returning how many.
    async fn reclaim(&self) -> Result<u64, SessionStoreError>;

    /// Number of live records across all principals.
    async fn count_live(&self) -> Result<u64, SessionStoreError>;
}

pub fn build_session_store(config: &Config, pool: DbPool) -> Arc<dyn SessionStore> {
    build_session_store_with_clock(config, pool, Arc::new(SystemClock))
}

pub fn build_session_store_with_clock(
    config: &Config,
    pool: DbPool,
    clock: Arc<dyn Clock>,
) -> Arc<dyn SessionStore> {
    match config.session_backend {
        SessionBackend::Memory => {
            tracing::info!(
                sweep_interval_minutes = config.session_sweep_interval_minutes,
                "Using in-memory session store"
            );
            Arc::new(InMemorySessionStore::new(
                clock,
                config.session_sweep_interval(),
            ))
        }
        SessionBackend::Database => {
            tracing::info!("Using database session store");
            Arc::new(DatabaseSessionStore::new(pool, clock))
        }
    }
}

/// Short, non-reusable prefix of a session id for log lines; the full id is a
/// credential and is never logged.
pub fn session_fingerprint(session_id: &str) -> &str {
    let end = session_id
        .char_indices()
        .nth(8)
        .map(|(idx, _)| idx)
        .unwrap_or(session_id.len());
    &session_id[..end]
}

pub(crate) fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
