//! Authentication and authorization module
//!
//! JWT-based authentication (token codec, access/refresh providers, request
//! interception) and ownership-based authorization.

pub mod authorize;
pub mod cookie;
pub mod gate;
pub mod middleware;
pub mod password;
pub mod token;

pub use gate::{authenticate, Credentials};
pub use middleware::auth_token_filter;
pub use token::{AccessTokenProvider, Claims, RefreshTokenProvider, TokenError};

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

/// Role names. Membership rides inside the access token; only the refresh
/// flow re-derives it from the database.
pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_MODERATOR: &str = "ROLE_MODERATOR";
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// Verified identity for one request.
///
/// Built when a credential check or token verification succeeds, never
/// mutated, dropped when the request ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ROLE_ADMIN)
    }
}

impl From<crate::db::AccountRecord> for Principal {
    fn from(account: crate::db::AccountRecord) -> Self {
        Self {
            id: account.id,
            uuid: account.uuid,
            username: account.username,
            email: account.email,
            roles: account.roles,
        }
    }
}

/// Extractor: the principal the interception pipeline attached to this
/// request. Rejects with 401 when the request never authenticated.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}
