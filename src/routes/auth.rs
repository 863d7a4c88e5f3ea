//! Authentication route handlers
//!
//! Login, register, refresh and logout. These are the unauthenticated-entry
//! endpoints: they talk to the authentication gate and the token providers
//! directly and are the only places that mint tokens.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::cookie::{build_refresh_cookie, clear_refresh_cookie, get_cookie, REFRESH_COOKIE_NAME};
use crate::auth::gate::{authenticate, resolve_by_uuid, Credentials};
use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::state::SharedState;

pub const LOGIN_ROUTE: &str = "/auth/login";
pub const REGISTER_ROUTE: &str = "/auth/register";
pub const REFRESH_ROUTE: &str = "/auth/refresh";

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

// ============================================
// Request/Response Types
// ============================================

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 5, max = 32, message = "Username must be between 5 and 32 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 32, message = "Password must be between 8 and 32 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 5, max = 32, message = "Username must be between 5 and 32 characters"),
        regex(path = *USERNAME_RE, message = "Username may only contain letters, digits and underscores")
    )]
    pub username: String,
    #[validate(email(message = "Email should be valid"))]
    pub email: String,
    #[validate(length(min = 8, max = 32, message = "Password must be between 8 and 32 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

// ============================================
// Route Handlers
// ============================================

/// POST /auth/login
///
/// Authenticate a credential pair; on success return an access token and
/// set the refresh-token cookie.
pub async fn login(State(state): State<SharedState>, Json(req): Json<LoginRequest>) -> Response {
    match login_inner(state, req).await {
        Ok(response) => response,
        Err(err) => err.into_response_at(LOGIN_ROUTE),
    }
}

async fn login_inner(state: SharedState, req: LoginRequest) -> Result<Response, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let credentials = Credentials {
        username: req.username,
        password: req.password,
    };
    let principal = authenticate(&state.accounts, &credentials).await?;

    let access_token = state.access_tokens.generate_token(&principal)?;
    let refresh_token = state.refresh_tokens.generate_token(&principal)?;
    let cookie = build_refresh_cookie(
        &refresh_token,
        state.refresh_tokens.ttl(),
        state.secure_cookies,
    );

    info!(username = %principal.username, "login succeeded");

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse { access_token }),
    )
        .into_response())
}

/// POST /auth/register
///
/// Create an account with the default role.
pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    match register_inner(state, req).await {
        Ok(response) => response,
        Err(err) => err.into_response_at(REGISTER_ROUTE),
    }
}

async fn register_inner(state: SharedState, req: RegisterRequest) -> Result<Response, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let password_hash = hash_password(&req.password)?;
    let account = state
        .accounts
        .create(&req.username, &req.email, &password_hash)
        .await?;

    info!(username = %account.username, "account created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Account created successfully" })),
    )
        .into_response())
}

/// GET /auth/refresh
///
/// Mint a new access token from the refresh cookie. The principal is
/// re-resolved from the store so the new token reflects current roles; the
/// refresh token itself is not rotated.
pub async fn refresh(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    match refresh_inner(state, headers).await {
        Ok(response) => response,
        Err(err) => err.into_response_at(REFRESH_ROUTE),
    }
}

async fn refresh_inner(state: SharedState, headers: HeaderMap) -> Result<Response, AppError> {
    let token = get_cookie(&headers, REFRESH_COOKIE_NAME).ok_or(AppError::Unauthenticated)?;

    let claims = state.refresh_tokens.verify(token)?;
    if claims.is_expired(Utc::now()) {
        return Err(AppError::TokenExpired);
    }

    // Fresh role lookup: a role or ban change since the refresh token was
    // issued takes effect here.
    let principal = resolve_by_uuid(&state.accounts, claims.jti).await?;
    let access_token = state.access_tokens.generate_token(&principal)?;

    Ok(Json(LoginResponse { access_token }).into_response())
}

/// GET /auth/logout
///
/// Unconditionally clear the refresh cookie. Idempotent; succeeds whether
/// or not the caller was ever authenticated.
pub async fn logout(State(state): State<SharedState>) -> Response {
    let cookie = clear_refresh_cookie(state.secure_cookies);
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(serde_json::json!({ "message": "Logged out" })),
    )
        .into_response()
}
