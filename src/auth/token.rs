//! JWT signing and verification
//!
//! One codec, two providers. The codec turns a claim set into a compact
//! HS256-signed token and back; the access and refresh providers fix the
//! claim-building and claim-reading policy on top of it. Verification order
//! is strict: signature and structure first, then the expiration predicate,
//! then any claim is trusted. An invalid signature therefore reveals nothing
//! about claim contents.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::AppError;

/// Closed verification failure taxonomy.
///
/// Expiration is deliberately NOT in this list: an expired token is still
/// trustworthy (its signature checked out), just stale. Callers test
/// staleness with [`Claims::is_expired`] after `verify` succeeds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Cannot be parsed as a signed three-segment structure at all.
    #[error("token is malformed")]
    Malformed,

    /// Parses, but uses an algorithm or header this codec does not accept.
    #[error("token type or algorithm is unsupported")]
    Unsupported,

    /// Structure is fine but signature or structural validation failed.
    #[error("token failed validation")]
    Invalid,
}

/// Claim set carried by every token.
///
/// Access tokens fill `roles`; refresh tokens leave it absent so a leaked
/// long-lived token carries as little as possible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the account username.
    pub sub: String,
    /// The account's public UUID.
    pub jti: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    /// Staleness predicate, checked only after `verify` succeeded.
    ///
    /// Strict boundary: a token is expired the instant `now` reaches `exp`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Signs and parses compact HS256 tokens against one symmetric secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        // Signature/structure checks only; expiration is a separate
        // predicate so callers can tell "not trustworthy" from "stale".
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = std::collections::HashSet::new();

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Build the time-dependent claim scaffolding around an identity.
    fn claims(&self, sub: &str, jti: Uuid, roles: Option<Vec<String>>) -> Claims {
        let now = Utc::now();
        Claims {
            sub: sub.to_string(),
            jti,
            roles,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        }
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature and structure; classify any failure into the closed
    /// taxonomy. Never touches the expiration claim.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Malformed,
                ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::MissingAlgorithm => TokenError::Unsupported,
                _ => TokenError::Invalid,
            })
    }
}

/// Short-lived, role-bearing tokens sent as `Authorization: Bearer`.
#[derive(Clone)]
pub struct AccessTokenProvider {
    codec: TokenCodec,
}

impl AccessTokenProvider {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            codec: TokenCodec::new(secret, Duration::minutes(ttl_minutes)),
        }
    }

    /// Embeds subject, uuid and the principal's role names.
    pub fn generate_token(&self, principal: &Principal) -> Result<String, AppError> {
        let claims = self.codec.claims(
            &principal.username,
            principal.uuid,
            Some(principal.roles.clone()),
        );
        self.codec.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.codec.verify(token)
    }

    pub fn username_from_token(&self, token: &str) -> Result<String, TokenError> {
        self.verify(token).map(|claims| claims.sub)
    }
}

/// Long-lived tokens delivered as an HTTP-only cookie; carry only enough to
/// re-resolve the principal (no roles, so nothing stale can be trusted).
#[derive(Clone)]
pub struct RefreshTokenProvider {
    codec: TokenCodec,
}

impl RefreshTokenProvider {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            codec: TokenCodec::new(secret, Duration::days(ttl_days)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.codec.ttl()
    }

    pub fn generate_token(&self, principal: &Principal) -> Result<String, AppError> {
        let claims = self
            .codec
            .claims(&principal.username, principal.uuid, None);
        self.codec.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.codec.verify(token)
    }

    pub fn uuid_from_token(&self, token: &str) -> Result<Uuid, TokenError> {
        self.verify(token).map(|claims| claims.jti)
    }
}
