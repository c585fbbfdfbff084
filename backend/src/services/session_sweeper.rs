//! Periodic reclamation of expired sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::services::session_store::SessionStore;

/// Spawns a task that calls [`SessionStore::reclaim`] every `interval`.
///
/// The pass runs on its own task so request handlers never wait on it. A
/// failed pass is logged and the loop carries on with the next tick.
pub fn spawn_session_sweeper(store: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_sweep(store.as_ref()).await;
        }
    })
}

pub async fn run_sweep(store: &dyn SessionStore) -> Option<u64> {
    match store.reclaim().await {
        Ok(count) => {
            tracing::debug!(count, "Session sweep finished");
            Some(count)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Session sweep failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session_store::{MockSessionStore, SessionStoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn run_sweep_reports_count() {
        let mut store = MockSessionStore::new();
        store.expect_reclaim().times(1).returning(|| Ok(3));
        assert_eq!(run_sweep(&store).await, Some(3));
    }

    #[tokio::test]
    async fn run_sweep_swallows_storage_errors() {
        let mut store = MockSessionStore::new();
        store
            .expect_reclaim()
            .times(1)
            .returning(|| Err(SessionStoreError::Corrupt("bad row".into())));
        assert_eq!(run_sweep(&store).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_each_interval() {
        let sweeps = Arc::new(AtomicUsize::new(0));
        let counter = sweeps.clone();
        let mut store = MockSessionStore::new();
        store.expect_reclaim().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        });
        let handle = spawn_session_sweeper(Arc::new(store), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(sweeps.load(Ordering::SeqCst), 2);
        handle.abort();
    }
}
