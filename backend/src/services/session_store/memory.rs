//! Volatile session store.
//!
//! Records are spread over a fixed set of shards keyed by session id, each
//! behind its own `RwLock`, so unrelated sessions never contend on one lock.
//! Every per-record transition happens under the owning shard's write lock.
//! Cross-record operations visit shards one at a time and may see records
//! created or expired mid-scan inconsistently.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    default_session_ttl, new_session_id, session_fingerprint, SessionStore, SessionStoreError,
};
use crate::models::session::{sort_summaries, SessionRecord, SessionSummary};
use crate::utils::clock::Clock;

const SHARD_COUNT: usize = 16;

type Shard = RwLock<HashMap<String, SessionRecord>>;

pub struct InMemorySessionStore {
    shards: Vec<Shard>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
    last_sweep: Mutex<DateTime<Utc>>,
}

impl InMemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>, sweep_interval: Duration) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        // Start at "now" so the first create does not sweep an empty store.
        let last_sweep = Mutex::new(clock.now());
        Self {
            shards,
            clock,
            sweep_interval,
            last_sweep,
        }
    }

    /// Physically held records, live or not.
    pub fn stored_len(&self) -> usize {
        self.shards.iter().map(|shard| read(shard).len()).sum()
    }

    fn shard_for(&self, session_id: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        session_id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// Runs [`SessionStore::reclaim`] only when the sweep interval has elapsed
    /// since the previous gated sweep.
    fn maybe_reclaim(&self) -> u64 {
        let now = self.clock.now();
        {
            let mut last_sweep = self
                .last_sweep
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if now - *last_sweep < self.sweep_interval {
                return 0;
            }
            *last_sweep = now;
        }
        self.sweep(now)
    }

    fn sweep(&self, now: DateTime<Utc>) -> u64 {
        let mut reclaimed = 0u64;
        let mut dropped = 0usize;
        for shard in &self.shards {
            let mut records = write(shard);
            let before = records.len();
            // Records already dead before this pass are dropped; records that
            // expire now are only marked, so revoke/get still see them once.
            records.retain(|_, record| record.active);
            dropped += before - records.len();
            for record in records.values_mut() {
                if record.is_expired(now) {
                    record.active = false;
                    reclaimed += 1;
                    tracing::debug!(
                        session = %session_fingerprint(&record.id),
                        principal = %record.principal,
                        "Reclaimed expired session"
                    );
                }
            }
        }
        if reclaimed > 0 || dropped > 0 {
            tracing::info!(reclaimed, dropped, "Swept in-memory session store");
        }
        reclaimed
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(
        &self,
        principal: &str,
        ttl: Option<Duration>,
    ) -> Result<String, SessionStoreError> {
        let now = self.clock.now();
        let ttl = ttl.unwrap_or_else(default_session_ttl);

        let session_id = loop {
            let candidate = new_session_id();
            let mut records = write(self.shard_for(&candidate));
            if records.contains_key(&candidate) {
                continue;
            }
            records.insert(
                candidate.clone(),
                SessionRecord {
                    id: candidate.clone(),
                    principal: principal.to_string(),
                    created_at: now,
                    expires_at: now + ttl,
                    last_accessed_at: now,
                    active: true,
                },
            );
            break candidate;
        };

        tracing::info!(
            session = %session_fingerprint(&session_id),
            principal = %principal,
            ttl_minutes = ttl.num_minutes(),
            "Created session"
        );

        self.maybe_reclaim();
        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, SessionStoreError> {
        if session_id.is_empty() {
            return Ok(None);
        }
        let now = self.clock.now();
        let mut records = write(self.shard_for(session_id));
        let Some(record) = records.get_mut(session_id) else {
            return Ok(None);
        };

        if !record.is_live(now) {
            if record.active {
                record.active = false;
                tracing::debug!(
                    session = %session_fingerprint(session_id),
                    "Deactivated expired session on read"
                );
            }
            return Ok(None);
        }

        record.last_accessed_at = now;
        Ok(Some(record.clone()))
    }

    async fn extend(&self, session_id: &str, minutes: i64) -> Result<bool, SessionStoreError> {
        let now = self.clock.now();
        let mut records = write(self.shard_for(session_id));
        let Some(record) = records.get_mut(session_id) else {
            return Ok(false);
        };

        if !record.is_live(now) {
            record.active = false;
            return Ok(false);
        }

        record.expires_at = now + Duration::minutes(minutes);
        record.last_accessed_at = now;
        tracing::info!(
            session = %session_fingerprint(session_id),
            minutes,
            "Extended session"
        );
        Ok(true)
    }

    async fn revoke(&self, session_id: &str) -> Result<bool, SessionStoreError> {
        let mut records = write(self.shard_for(session_id));
        match records.get_mut(session_id) {
            Some(record) if record.active => {
                record.active = false;
                tracing::info!(
                    session = %session_fingerprint(session_id),
                    principal = %record.principal,
                    "Revoked session"
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_principal(
        &self,
        principal: &str,
    ) -> Result<Vec<SessionSummary>, SessionStoreError> {
        let now = self.clock.now();
        let mut summaries: Vec<SessionSummary> = self
            .shards
            .iter()
            .flat_map(|shard| {
                read(shard)
                    .values()
                    .filter(|record| record.principal == principal && record.is_live(now))
                    .map(SessionRecord::summary)
                    .collect::<Vec<_>>()
            })
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn revoke_all_by_principal(&self, principal: &str) -> Result<u64, SessionStoreError> {
        let now = self.clock.now();
        let mut count = 0u64;
        for shard in &self.shards {
            let mut records = write(shard);
            for record in records
                .values_mut()
                .filter(|record| record.principal == principal && record.is_live(now))
            {
                record.active = false;
                count += 1;
            }
        }
        tracing::info!(principal = %principal, count, "Revoked all sessions for principal");
        Ok(count)
    }

    async fn reclaim(&self) -> Result<u64, SessionStoreError> {
        Ok(self.sweep(self.clock.now()))
    }

    async fn count_live(&self) -> Result<u64, SessionStoreError> {
        let now = self.clock.now();
        let count = self
            .shards
            .iter()
            .map(|shard| read(shard).values().filter(|r| r.is_live(now)).count() as u64)
            .sum();
        Ok(count)
    }
}

// A panic while holding a shard lock cannot leave a record half-written
// (every mutation is a single field store), so poisoned locks are recovered.
fn read(shard: &Shard) -> RwLockReadGuard<'_, HashMap<String, SessionRecord>> {
    shard.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(shard: &Shard) -> RwLockWriteGuard<'_, HashMap<String, SessionRecord>> {
    shard.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
