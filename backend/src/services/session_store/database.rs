//! Durable session store backed by the `sessions` table.
//!
//! Every mutation is a single conditional statement, so a concurrent reader of
//! the same id sees either the old row or the new one. Writes complete before
//! the call returns; a failed insert surfaces as an error and no id escapes.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::{
    default_session_ttl, new_session_id, session_fingerprint, SessionStore, SessionStoreError,
};
use crate::db::connection::DbPool;
use crate::models::session::{sort_summaries, SessionRecord, SessionSummary};
use crate::utils::clock::Clock;

const SESSION_COLUMNS: &str = "id, principal, created_at, expires_at, last_accessed_at, active";

pub struct DatabaseSessionStore {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DatabaseSessionStore {
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Reads a row regardless of liveness, without touching it.
    pub async fn find_raw(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let sql = format!("SELECT {} FROM sessions WHERE id = ?", SESSION_COLUMNS);
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Deletes inactive rows whose expiry is older than `before`.
    ///
    /// `reclaim` only flips the active flag; this is the pass that actually
    /// shrinks the table.
    pub async fn purge_inactive(&self, before: DateTime<Utc>) -> Result<u64, SessionStoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE active = 0 AND expires_at < ?")
            .bind(before)
            .execute(&self.pool)
            .await?;
        let purged = result.rows_affected();
        if purged > 0 {
            tracing::info!(purged, "Purged inactive session rows");
        }
        Ok(purged)
    }

    async fn deactivate_if_expired(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SessionStoreError> {
        let result = sqlx::query(
            "UPDATE sessions SET active = 0 WHERE id = ? AND active = 1 AND expires_at <= ?",
        )
        .bind(session_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            tracing::debug!(
                session = %session_fingerprint(session_id),
                "Deactivated expired session on read"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for DatabaseSessionStore {
    async fn create(
        &self,
        principal: &str,
        ttl: Option<Duration>,
    ) -> Result<String, SessionStoreError> {
        let now = self.clock.now();
        let ttl = ttl.unwrap_or_else(default_session_ttl);
        let session_id = new_session_id();

        sqlx::query(
            r#"
            INSERT INTO sessions (id, principal, created_at, expires_at, last_accessed_at, active)
            VALUES (?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(&session_id)
        .bind(principal)
        .bind(now)
        .bind(now + ttl)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            session = %session_fingerprint(&session_id),
            principal = %principal,
            ttl_minutes = ttl.num_minutes(),
            "Created database session"
        );

        // The row is committed; a failed sweep must not turn this into an error.
        if let Err(err) = self.reclaim().await {
            tracing::error!(error = %err, "Error during session cleanup");
        }

        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        if session_id.is_empty() {
            return Ok(None);
        }
        let now = self.clock.now();
        let sql = format!(
            r#"
            UPDATE sessions
            SET last_accessed_at = ?
            WHERE id = ? AND active = 1 AND expires_at > ?
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(now)
            .bind(session_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        match record {
            Some(record) => Ok(Some(record)),
            None => {
                self.deactivate_if_expired(session_id, now).await?;
                Ok(None)
            }
        }
    }

    async fn extend(&self, session_id: &str, minutes: i64) -> Result<bool, SessionStoreError> {
        let now = self.clock.now();
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET expires_at = ?, last_accessed_at = ?
            WHERE id = ? AND active = 1 AND expires_at > ?
            "#,
        )
        .bind(now + Duration::minutes(minutes))
        .bind(now)
        .bind(session_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.deactivate_if_expired(session_id, now).await?;
            return Ok(false);
        }

        tracing::info!(
            session = %session_fingerprint(session_id),
            minutes,
            "Extended database session"
        );
        Ok(true)
    }

    async fn revoke(&self, session_id: &str) -> Result<bool, SessionStoreError> {
        let result = sqlx::query("UPDATE sessions SET active = 0 WHERE id = ? AND active = 1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        let revoked = result.rows_affected() > 0;
        if revoked {
            tracing::info!(
                session = %session_fingerprint(session_id),
                "Deactivated database session"
            );
        }
        Ok(revoked)
    }

    async fn list_by_principal(
        &self,
        principal: &str,
    ) -> Result<Vec<SessionSummary>, SessionStoreError> {
        let now = self.clock.now();
        let sql = format!(
            "SELECT {} FROM sessions WHERE principal = ? AND active = 1 AND expires_at > ?",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(principal)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        let mut summaries: Vec<SessionSummary> = records
            .iter()
            .filter(|record| record.is_live(now))
            .map(SessionRecord::summary)
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn revoke_all_by_principal(&self, principal: &str) -> Result<u64, SessionStoreError> {
        let now = self.clock.now();
        let result = sqlx::query(
            "UPDATE sessions SET active = 0 WHERE principal = ? AND active = 1 AND expires_at > ?",
        )
        .bind(principal)
        .bind(now)
        .execute(&self.pool)
        .await?;
        let count = result.rows_affected();
        tracing::info!(principal = %principal, count, "Deactivated sessions for principal");
        Ok(count)
    }

    async fn reclaim(&self) -> Result<u64, SessionStoreError> {
        let now = self.clock.now();
        let result =
            sqlx::query("UPDATE sessions SET active = 0 WHERE active = 1 AND expires_at <= ?")
                .bind(now)
                .execute(&self.pool)
                .await?;
        let count = result.rows_affected();
        if count > 0 {
            tracing::info!(count, "Cleaned up expired sessions");
        }
        Ok(count)
    }

    async fn count_live(&self) -> Result<u64, SessionStoreError> {
        let now = self.clock.now();
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE active = 1 AND expires_at > ?")
                .bind(now)
                .fetch_one(&self.pool)
                .await?;
        u64::try_from(count).map_err(|_| SessionStoreError::Corrupt(format!("negative count {}", count)))
    }
}
