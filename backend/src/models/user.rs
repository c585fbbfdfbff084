//! Models that represent user accounts and authentication payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::rules::validate_display_name;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a user account.
pub struct User {
    /// Unique identifier for the user.
    pub id: String,
    /// Login identity; also the principal of the user's sessions and tokens.
    pub email: String,
    /// Human-readable name.
    pub name: String,
    /// Argon2id PHC digest of the user's password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp for auditing.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Public projection of [`User`].
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
/// Payload for creating an account.
pub struct RegisterRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
/// Credentials submitted to either login route.
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Response of the bearer-token login.
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token's embedded expiry.
    pub expires_in: i64,
}

/// Trims and lowercases an email so lookups and inserts agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn register_request_rejects_short_password_and_bad_email() {
        let payload = RegisterRequest {
            name: "Alice".into(),
            email: "not-an-email".into(),
            password: "short".into(),
        };
        let errors = payload.validate().expect_err("should fail validation");
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn user_serialization_omits_password_hash() {
        let now = Utc::now();
        let user = User {
            id: "u-1".into(),
            email: "alice@example.com".into(),
            name: "Alice".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).expect("serialize");
        assert!(json.get("password_hash").is_none());
    }
}
