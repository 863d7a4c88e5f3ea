//! Request interception pipeline
//!
//! One pass per request, no retries: extract the bearer token, verify it,
//! check staleness, resolve the principal, attach it to the request and
//! hand off. Any failure short-circuits with a structured 401 and the
//! downstream handler never runs.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::debug;

use crate::auth::Principal;
use crate::db::AccountFinder;
use crate::error::AppError;
use crate::state::SharedState;

/// Exact paths that bypass the bearer check entirely. This is a routing
/// decision, not a security boundary; it exists so login, registration and
/// the cookie-driven flows never pay for token work.
pub const PERMITTED_PATHS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/refresh",
    "/auth/logout",
    "/health",
];

fn is_permitted(path: &str) -> bool {
    PERMITTED_PATHS.contains(&path)
}

pub async fn auth_token_filter(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    if is_permitted(&path) {
        return next.run(request).await;
    }

    let bearer = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::to_owned);

    // No bearer token: pass through unauthenticated. Handlers that need an
    // identity enforce their own requirement.
    let Some(token) = bearer else {
        return next.run(request).await;
    };

    // Signature before expiration before claim trust.
    let claims = match state.access_tokens.verify(&token) {
        Ok(claims) => claims,
        Err(err) => {
            debug!(path = %path, "rejected bearer token: {}", err);
            return AppError::Token(err).into_response_at(&path);
        }
    };

    if claims.is_expired(Utc::now()) {
        return AppError::TokenExpired.into_response_at(&path);
    }

    // Identity fields come from the store (so a deleted account dies here);
    // roles come from the verified token and are not re-queried.
    let account = match state
        .accounts
        .find(AccountFinder::ByUsername(&claims.sub))
        .await
    {
        Ok(Some(account)) => account,
        Ok(None) => return AppError::Unauthenticated.into_response_at(&path),
        Err(err) => return err.into_response_at(&path),
    };

    let principal = Principal {
        id: account.id,
        uuid: account.uuid,
        username: account.username,
        email: account.email,
        roles: claims.roles.unwrap_or_default(),
    };

    // Attachment is the final step before hand-off; a request abandoned
    // mid-verification never exposes a half-built identity.
    request.extensions_mut().insert(principal);
    next.run(request).await
}
