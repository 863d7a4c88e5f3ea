//! Success response envelope
//!
//! Mirrors the error body shape: payload plus the route that produced it and
//! a timestamp.

use axum::{response::IntoResponse, response::Response, Json};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SuccessfulResponse<T: Serialize> {
    pub data: T,
    pub instance: String,
    pub timestamp: String,
}

impl<T: Serialize> SuccessfulResponse<T> {
    pub fn build(data: T, instance: impl Into<String>) -> Self {
        Self {
            data,
            instance: instance.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T: Serialize> IntoResponse for SuccessfulResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn envelope_carries_instance_and_timestamp() {
        let envelope = SuccessfulResponse::build(serde_json::json!({"ok": true}), "/api/v1/users/me");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["instance"], "/api/v1/users/me");
        assert_eq!(json["data"]["ok"], true);
        assert!(json["timestamp"].as_str().is_some());
    }
}
