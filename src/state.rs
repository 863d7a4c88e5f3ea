//! Application state management
//!
//! Shared state for all handlers. The token providers hold the signing
//! secret loaded once at startup; nothing in here is mutable after boot.

use crate::auth::token::{AccessTokenProvider, RefreshTokenProvider};
use crate::config::AuthConfig;
use crate::db::AccountService;
use deadpool_postgres::Pool;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Database connection pool (required)
    pub db_pool: Pool,

    /// Account lookup/mutation service
    pub accounts: AccountService,

    /// Short-lived, role-bearing bearer tokens
    pub access_tokens: AccessTokenProvider,

    /// Long-lived, cookie-delivered tokens
    pub refresh_tokens: RefreshTokenProvider,

    /// Whether refresh cookies are marked `Secure`
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(pool: Pool, auth: &AuthConfig) -> Self {
        Self {
            accounts: AccountService::new(pool.clone()),
            db_pool: pool,
            access_tokens: AccessTokenProvider::new(&auth.jwt_secret, auth.access_ttl_minutes),
            refresh_tokens: RefreshTokenProvider::new(&auth.jwt_secret, auth.refresh_ttl_days),
            secure_cookies: auth.secure_cookies,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
