use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::middleware::edge_guard::EdgeGuard;
use crate::services::auth_service::AuthService;
use crate::services::cookie_service::CookieService;
use crate::services::jwt_service::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub jwt: JwtService,
    pub cookies: CookieService,
    pub guard: Arc<EdgeGuard>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Result<Self, ConfigError> {
        let jwt = JwtService::new(&config.jwt)?;
        Ok(Self {
            auth: AuthService::new(pool, jwt.clone(), config.bcrypt_cost),
            cookies: CookieService::new(&config.cookies),
            guard: Arc::new(EdgeGuard::new(config.guard.clone(), jwt.clone())),
            jwt,
        })
    }
}
