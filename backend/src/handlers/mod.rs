pub mod auth;
pub mod health;
pub mod secure_auth;
