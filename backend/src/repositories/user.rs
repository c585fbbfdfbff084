//! Account lookups used by the login collaborators.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::user::{normalize_email, User};

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    sqlx::query_as::<_, User>(&sql)
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(normalize_email(email))
        .fetch_one(pool)
        .await?;
    Ok(exists != 0)
}

pub async fn insert_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    let sql = format!(
        r#"
        INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(normalize_email(email))
        .bind(name.trim())
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
}

pub async fn update_password_hash(
    pool: &SqlitePool,
    user_id: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Whether a failed insert was rejected by the unique email constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
