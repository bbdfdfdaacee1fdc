//! DTOs for the shorten endpoint.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

/// Principals are opaque handles; anything printable-ASCII and short.
static CREATED_BY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\x21-\x7E]{1,128}$").unwrap());

/// Request to create a short URL.
///
/// `url` is checked against the full policy (length, scheme, host lists) in
/// the service; the DTO only enforces shape.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The original URL to shorten (must be absolute http/https).
    #[validate(length(min = 1, message = "url must not be empty"))]
    pub url: String,

    /// Optional custom alias; normalized to the base-62 alphabet.
    #[validate(length(min = 1, max = 64))]
    pub custom_alias: Option<String>,

    /// Optional expiry. After this instant the link returns 410 Gone.
    pub expire_at: Option<DateTime<Utc>>,

    /// Opaque owning principal.
    #[validate(regex(path = "*CREATED_BY_REGEX", message = "created_by must be printable ASCII"))]
    pub created_by: Option<String>,

    /// Free-form metadata stored alongside the record.
    #[validate(length(max = 4096))]
    pub metadata: Option<String>,
}

/// The committed record returned with 201 Created.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub code: String,
    pub short_url: String,
    pub long_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request_validates() {
        let request: ShortenRequest =
            serde_json::from_str(r#"{"url":"https://example.com/a"}"#).unwrap();
        assert!(request.validate().is_ok());
        assert!(request.custom_alias.is_none());
    }

    #[test]
    fn test_empty_url_rejected() {
        let request: ShortenRequest = serde_json::from_str(r#"{"url":""}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_created_by_rejects_control_chars() {
        let request: ShortenRequest = serde_json::from_str(
            r#"{"url":"https://example.com","created_by":"user\nname"}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_full_request_deserializes() {
        let request: ShortenRequest = serde_json::from_str(
            r#"{
                "url": "https://example.com/a",
                "custom_alias": "promo2024",
                "expire_at": "2030-01-01T00:00:00Z",
                "created_by": "svc-marketing",
                "metadata": "{\"campaign\":\"q1\"}"
            }"#,
        )
        .unwrap();

        assert!(request.validate().is_ok());
        assert_eq!(request.custom_alias.as_deref(), Some("promo2024"));
        assert!(request.expire_at.is_some());
    }

    #[test]
    fn test_response_omits_absent_expiry() {
        let response = ShortenResponse {
            code: "abcd1234".to_string(),
            short_url: "http://localhost:8080/abcd1234".to_string(),
            long_url: "https://example.com/a".to_string(),
            expire_at: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("expire_at"));
    }
}
