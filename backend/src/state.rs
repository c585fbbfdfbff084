use std::sync::Arc;

use crate::{
    config::Config, db::connection::DbPool, services::session_store::SessionStore,
    utils::jwt::TokenIssuer,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub sessions: Arc<dyn SessionStore>,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config, sessions: Arc<dyn SessionStore>) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_expiration());
        Self {
            pool,
            config,
            sessions,
            tokens,
        }
    }
}
