//! User route handlers
//!
//! The mutation endpoints are parameterized by an owner-identifying path
//! variable (username, uuid or email); each one runs the ownership decision
//! before touching the store. Identity comes from the `Principal` extractor
//! the interception pipeline feeds.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::auth::authorize;
use crate::auth::password::hash_password;
use crate::auth::Principal;
use crate::db::{AccountFinder, AccountUpdate};
use crate::error::AppError;
use crate::response::SuccessfulResponse;
use crate::state::SharedState;

pub const ME_ROUTE: &str = "/api/v1/users/me";

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(email(message = "Email should be valid"))]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 32, message = "Password must be between 8 and 32 characters"))]
    pub password: Option<String>,
}

/// GET /api/v1/users/me
pub async fn me(principal: Principal) -> Response {
    SuccessfulResponse::build(principal, ME_ROUTE).into_response()
}

// ============================================
// PATCH by owner field
// ============================================

pub async fn update_by_username(
    State(state): State<SharedState>,
    principal: Principal,
    Path(username): Path<String>,
    Json(req): Json<UpdateAccountRequest>,
) -> Response {
    let instance = format!("/api/v1/users/username/{}", username);
    if !authorize::by_username(&principal, &username) {
        return AppError::UnauthorizedFieldAccess.into_response_at(&instance);
    }
    apply_update(state, AccountFinder::ByUsername(&username), req, &instance).await
}

pub async fn update_by_uuid(
    State(state): State<SharedState>,
    principal: Principal,
    Path(uuid): Path<String>,
    Json(req): Json<UpdateAccountRequest>,
) -> Response {
    let instance = format!("/api/v1/users/uuid/{}", uuid);
    if !authorize::by_uuid(&principal, &uuid) {
        return AppError::UnauthorizedFieldAccess.into_response_at(&instance);
    }
    let Ok(uuid) = uuid.parse::<uuid::Uuid>() else {
        return AppError::BadRequest("Invalid UUID format".to_string()).into_response_at(&instance);
    };
    apply_update(state, AccountFinder::ByUuid(uuid), req, &instance).await
}

pub async fn update_by_email(
    State(state): State<SharedState>,
    principal: Principal,
    Path(email): Path<String>,
    Json(req): Json<UpdateAccountRequest>,
) -> Response {
    let instance = format!("/api/v1/users/email/{}", email);
    if !authorize::by_email(&principal, &email) {
        return AppError::UnauthorizedFieldAccess.into_response_at(&instance);
    }
    apply_update(state, AccountFinder::ByEmail(&email), req, &instance).await
}

async fn apply_update(
    state: SharedState,
    finder: AccountFinder<'_>,
    req: UpdateAccountRequest,
    instance: &str,
) -> Response {
    match apply_update_inner(state, finder, req).await {
        Ok(principal) => SuccessfulResponse::build(principal, instance).into_response(),
        Err(err) => err.into_response_at(instance),
    }
}

async fn apply_update_inner(
    state: SharedState,
    finder: AccountFinder<'_>,
    req: UpdateAccountRequest,
) -> Result<Principal, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let password_hash = match &req.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    let update = AccountUpdate {
        email: req.email,
        password_hash,
    };

    let account = state.accounts.update(finder, update).await?;
    info!(username = %account.username, "account updated");

    Ok(account.into())
}

// ============================================
// DELETE by owner field
// ============================================

pub async fn delete_by_username(
    State(state): State<SharedState>,
    principal: Principal,
    Path(username): Path<String>,
) -> Response {
    let instance = format!("/api/v1/users/username/{}", username);
    if !authorize::by_username(&principal, &username) {
        return AppError::UnauthorizedFieldAccess.into_response_at(&instance);
    }
    apply_delete(state, AccountFinder::ByUsername(&username), &instance).await
}

pub async fn delete_by_uuid(
    State(state): State<SharedState>,
    principal: Principal,
    Path(uuid): Path<String>,
) -> Response {
    let instance = format!("/api/v1/users/uuid/{}", uuid);
    if !authorize::by_uuid(&principal, &uuid) {
        return AppError::UnauthorizedFieldAccess.into_response_at(&instance);
    }
    let Ok(uuid) = uuid.parse::<uuid::Uuid>() else {
        return AppError::BadRequest("Invalid UUID format".to_string()).into_response_at(&instance);
    };
    apply_delete(state, AccountFinder::ByUuid(uuid), &instance).await
}

pub async fn delete_by_email(
    State(state): State<SharedState>,
    principal: Principal,
    Path(email): Path<String>,
) -> Response {
    let instance = format!("/api/v1/users/email/{}", email);
    if !authorize::by_email(&principal, &email) {
        return AppError::UnauthorizedFieldAccess.into_response_at(&instance);
    }
    apply_delete(state, AccountFinder::ByEmail(&email), &instance).await
}

async fn apply_delete(state: SharedState, finder: AccountFinder<'_>, instance: &str) -> Response {
    match state.accounts.delete(finder).await {
        Ok(()) => SuccessfulResponse::build(
            serde_json::json!({ "message": "Account deleted" }),
            instance,
        )
        .into_response(),
        Err(err) => err.into_response_at(instance),
    }
}
