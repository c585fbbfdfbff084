use authkeeper_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations},
    services::session_store::{database::DatabaseSessionStore, SessionStore},
    utils::clock::{Clock, SystemClock},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One-shot maintenance pass over the `sessions` table, meant for cron.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authkeeper_backend=info,session_sweep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let clock = Arc::new(SystemClock);
    let store = DatabaseSessionStore::new(pool.clone(), clock.clone());

    let reclaimed = store.reclaim().await?;
    let cutoff = clock.now() - config.session_retention();
    let purged = store.purge_inactive(cutoff).await?;

    tracing::info!(
        reclaimed,
        purged,
        retention_days = config.session_retention_days,
        "Session sweep complete"
    );

    sqlx::query("PRAGMA optimize").execute(&pool).await?;
    pool.close().await;
    Ok(())
}
