use std::net::SocketAddr;

use authkeeper_backend::{
    build_router,
    config::Config,
    db::connection::{create_pool, run_migrations, DbPool},
    services::{session_store::build_session_store, session_sweeper::spawn_session_sweeper},
    state::AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authkeeper_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        jwt_secret = %mask_secret(&config.jwt_secret),
        jwt_expiration_minutes = config.jwt_expiration_minutes,
        session_backend = ?config.session_backend,
        session_ttl_minutes = config.session_ttl_minutes,
        session_sweep_interval_minutes = config.session_sweep_interval_minutes,
        cookie_secure = config.cookie_secure,
        "Loaded configuration from environment/.env"
    );

    let pool: DbPool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let sessions = build_session_store(&config, pool.clone());
    let sweep_interval = config.session_sweep_interval().to_std()?;
    let _sweeper = spawn_session_sweeper(sessions.clone(), sweep_interval);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let app = build_router(AppState::new(pool, config, sessions));

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
