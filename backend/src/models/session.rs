//! Models for server-side login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
/// A single server-side session.
pub struct SessionRecord {
    /// Opaque random identifier; the lookup key.
    pub id: String,
    /// Identity the session authenticates as (account email).
    pub principal: String,
    /// Timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// Sole authority for liveness; moved only by an explicit extend.
    pub expires_at: DateTime<Utc>,
    /// Timestamp of the last successful lookup or extend.
    pub last_accessed_at: DateTime<Utc>,
    /// Cleared by revocation or reclamation; never set again.
    pub active: bool,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// A record is live iff it is active and `now < expires_at`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
/// What session listings expose about each record.
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Orders summaries most recently used first, then newest created, then by id.
pub fn sort_summaries(summaries: &mut [SessionSummary]) {
    summaries.sort_by(|a, b| {
        b.last_accessed_at
            .cmp(&a.last_accessed_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.session_id.cmp(&a.session_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(now: DateTime<Utc>, active: bool, ttl: Duration) -> SessionRecord {
        SessionRecord {
            id: "s-1".into(),
            principal: "alice@example.com".into(),
            created_at: now,
            expires_at: now + ttl,
            last_accessed_at: now,
            active,
        }
    }

    #[test]
    fn liveness_requires_active_and_unexpired() {
        let now = Utc::now();
        assert!(record(now, true, Duration::minutes(1)).is_live(now));
        assert!(!record(now, false, Duration::minutes(30)).is_live(now));
        assert!(!record(now, true, Duration::zero()).is_live(now));
        assert!(!record(now, true, Duration::minutes(1)).is_live(now + Duration::minutes(1)));
    }

    #[test]
    fn sort_summaries_orders_by_recent_access() {
        let now = Utc::now();
        let older = SessionSummary {
            session_id: "a".into(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now + Duration::minutes(30),
        };
        let newer = SessionSummary {
            session_id: "b".into(),
            created_at: now,
            last_accessed_at: now + Duration::minutes(2),
            expires_at: now + Duration::minutes(30),
        };
        let mut list = vec![older.clone(), newer.clone()];
        sort_summaries(&mut list);
        assert_eq!(list, vec![newer, older]);
    }
}
