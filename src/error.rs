//! Error handling module
//!
//! The closed failure taxonomy for the whole application. Every expected
//! failure path is a value of `AppError`; conversion to an HTTP response
//! happens exactly once, in the `IntoResponse` impl (or `into_response_at`
//! when the caller knows the request path).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::token::TokenError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Structural or cryptographic token verification failure. The wire
    /// response is identical for every `TokenError` variant; which check
    /// failed must not be observable by the caller.
    #[error("Invalid token")]
    Token(#[from] TokenError),

    #[error("Credential token is expired")]
    TokenExpired,

    /// Opaque by contract: covers unknown username, password mismatch and
    /// disabled accounts uniformly.
    #[error("Invalid credentials")]
    WrongCredentials,

    /// Identity is known, permission is denied (403, not 401).
    #[error("Access to this resource is denied")]
    UnauthorizedFieldAccess,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Invalid username")]
    DuplicateUsername,

    #[error("Invalid email")]
    DuplicateEmail,

    #[error("You may login and try again!")]
    Unauthenticated,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body: `{message, code, instance?, timestamp}`.
///
/// `instance` is the route that produced the error; filled in where the
/// producer knows it, omitted otherwise.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn build(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            instance: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    /// Map an error value onto its HTTP status and wire body.
    ///
    /// 5xx causes are logged here with full detail; the body stays generic.
    pub fn status_and_body(&self) -> (StatusCode, ErrorResponse) {
        match self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::build("An internal error occurred", "INTERNAL_ERROR"),
                )
            }
            AppError::Pool(e) => {
                error!("Pool error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::build("An internal error occurred", "INTERNAL_ERROR"),
                )
            }
            AppError::Token(e) => {
                debug!("Token verification failed: {}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::build("Invalid token", "ACCOUNT_108"),
                )
            }
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::build("Credential token is expired", "ACCOUNT_107"),
            ),
            AppError::WrongCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::build("Invalid credentials", "ACCOUNT_102"),
            ),
            AppError::UnauthorizedFieldAccess => (
                StatusCode::FORBIDDEN,
                ErrorResponse::build("Access to this resource is denied", "ACCOUNT_109"),
            ),
            AppError::AccountNotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse::build("Account not found", "ACCOUNT_103"),
            ),
            AppError::DuplicateUsername => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::build("Invalid username", "ACCOUNT_100"),
            ),
            AppError::DuplicateEmail => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::build("Invalid email", "ACCOUNT_101"),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::build("You may login and try again!", "UNAUTHENTICATED"),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::build(msg.clone(), "VALIDATION_ERROR"),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::build(msg.clone(), "BAD_REQUEST"),
            ),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::build("An internal error occurred", "INTERNAL_ERROR"),
                )
            }
        }
    }

    /// Convert into a response carrying the originating route as `instance`.
    pub fn into_response_at(self, instance: &str) -> Response {
        let (status, mut body) = self.status_and_body();
        body.instance = Some(instance.to_string());
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn token_errors_share_one_wire_code() {
        // The three structural failures must be indistinguishable on the wire.
        for err in [
            TokenError::Malformed,
            TokenError::Unsupported,
            TokenError::Invalid,
        ] {
            let (status, body) = AppError::Token(err).status_and_body();
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body.code, "ACCOUNT_108");
            assert_eq!(body.message, "Invalid token");
        }
    }

    #[test]
    fn expired_is_distinguishable_from_invalid() {
        let (status, body) = AppError::TokenExpired.status_and_body();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.code, "ACCOUNT_107");
    }

    #[test]
    fn denied_ownership_is_403_not_401() {
        let (status, _) = AppError::UnauthorizedFieldAccess.status_and_body();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn instance_is_attached_when_known() {
        let (_, mut body) = AppError::WrongCredentials.status_and_body();
        assert!(body.instance.is_none());
        body.instance = Some("/auth/login".to_string());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["instance"], "/auth/login");
        assert_eq!(json["code"], "ACCOUNT_102");
        assert!(json["timestamp"].as_str().is_some());
    }
}
