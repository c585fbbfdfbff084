use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::env;

use crate::utils::cookies::{CookieOptions, SameSite};

/// Upper bound for every `*_MINUTES` key: one year.
pub const MAX_DURATION_MINUTES: u64 = 525_600;
/// Upper bound for `SESSION_RETENTION_DAYS`: ten years.
pub const MAX_RETENTION_DAYS: u64 = 3_650;

/// Which session store implementation backs the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// Records live in process memory and are lost on restart.
    Memory,
    /// Records are persisted in the `sessions` table.
    Database,
}

impl std::str::FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" | "in-memory" => Ok(SessionBackend::Memory),
            "database" | "db" | "sql" => Ok(SessionBackend::Database),
            other => Err(anyhow!("Invalid SESSION_BACKEND value: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_minutes: u64,
    pub session_backend: SessionBackend,
    pub session_ttl_minutes: u64,
    pub session_sweep_interval_minutes: u64,
    /// Days an inactive session row is kept before `session_sweep` deletes it.
    pub session_retention_days: u64,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    pub bind_addr: String,
    pub cors_allow_origins: Vec<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://authkeeper.db".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let jwt_expiration_minutes =
            parse_bounded_u64_env("JWT_EXPIRATION_MINUTES", 30, MAX_DURATION_MINUTES)?;

        let session_backend = env::var("SESSION_BACKEND")
            .unwrap_or_else(|_| "database".to_string())
            .parse::<SessionBackend>()?;

        let session_ttl_minutes =
            parse_bounded_u64_env("SESSION_TTL_MINUTES", 30, MAX_DURATION_MINUTES)?;
        let session_sweep_interval_minutes =
            parse_bounded_u64_env("SESSION_SWEEP_INTERVAL_MINUTES", 5, MAX_DURATION_MINUTES)?;
        let session_retention_days =
            parse_bounded_u64_env("SESSION_RETENTION_DAYS", 30, MAX_RETENTION_DAYS)?;

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cookie_same_site = env::var("COOKIE_SAMESITE")
            .unwrap_or_else(|_| "lax".to_string())
            .parse::<SameSite>()
            .map_err(|e| anyhow!("Invalid COOKIE_SAMESITE value: {}", e))?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_expiration_minutes,
            session_backend,
            session_ttl_minutes,
            session_sweep_interval_minutes,
            session_retention_days,
            cookie_secure,
            cookie_same_site,
            bind_addr,
            cors_allow_origins,
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        bounded_minutes(self.session_ttl_minutes)
    }

    pub fn session_sweep_interval(&self) -> chrono::Duration {
        bounded_minutes(self.session_sweep_interval_minutes)
    }

    pub fn jwt_expiration(&self) -> chrono::Duration {
        bounded_minutes(self.jwt_expiration_minutes)
    }

    pub fn session_retention(&self) -> chrono::Duration {
        let days = i64::try_from(self.session_retention_days.min(MAX_RETENTION_DAYS))
            .unwrap_or_default();
        chrono::Duration::days(days)
    }

    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            secure: self.cookie_secure,
            same_site: self.cookie_same_site,
        }
    }
}

/// Configs built in code skip `load`, so the accessors clamp as well.
fn bounded_minutes(minutes: u64) -> chrono::Duration {
    let minutes = i64::try_from(minutes.min(MAX_DURATION_MINUTES)).unwrap_or_default();
    chrono::Duration::minutes(minutes)
}

fn parse_bounded_u64_env(key: &str, default: u64, max: u64) -> anyhow::Result<u64> {
    let value = parse_u64_env(key, default);
    if value > max {
        return Err(anyhow!("{} must be at most {} (got {})", key, max, value));
    }
    Ok(value)
}

fn parse_u64_env(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
