//! Ownership-based authorization decisions
//!
//! For mutation endpoints parameterized by an owner-identifying path
//! variable, the rule is: the caller may proceed if they ARE the resource
//! owner, or if they hold the administrative role. Pure boolean decision,
//! evaluated fresh per request against the pipeline-resolved principal;
//! never cached, never errors.

use uuid::Uuid;

use crate::auth::Principal;

/// Which identifying field of the principal the route parameterizes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerField {
    Username,
    Uuid,
    Email,
}

/// The ownership rule: `owner-field match OR admin`.
pub fn authorize_by_field(principal: &Principal, field: OwnerField, path_value: &str) -> bool {
    let owns = match field {
        OwnerField::Username => principal.username == path_value,
        OwnerField::Email => principal.email == path_value,
        // Parse rather than compare strings so casing and formatting of the
        // path variable cannot produce a false mismatch.
        OwnerField::Uuid => Uuid::parse_str(path_value)
            .map(|uuid| uuid == principal.uuid)
            .unwrap_or(false),
    };
    owns || principal.is_admin()
}

pub fn by_username(principal: &Principal, username: &str) -> bool {
    authorize_by_field(principal, OwnerField::Username, username)
}

pub fn by_uuid(principal: &Principal, uuid: &str) -> bool {
    authorize_by_field(principal, OwnerField::Uuid, uuid)
}

pub fn by_email(principal: &Principal, email: &str) -> bool {
    authorize_by_field(principal, OwnerField::Email, email)
}
