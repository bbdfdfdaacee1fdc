//! DTOs for metadata, deletion, and owner listing endpoints.

use crate::domain::entities::{ShortUrl, UrlMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a short URL joined with its click statistics.
#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub code: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
    pub custom_alias: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub total_clicks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_access_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_access_at: Option<DateTime<Utc>>,
}

impl From<UrlMetadata> for MetadataResponse {
    fn from(meta: UrlMetadata) -> Self {
        Self {
            code: meta.code,
            long_url: meta.long_url,
            created_at: meta.created_at,
            expire_at: meta.expire_at,
            custom_alias: meta.custom_alias,
            created_by: meta.created_by,
            metadata: meta.metadata,
            total_clicks: meta.total_clicks,
            first_access_at: meta.first_access_at,
            last_access_at: meta.last_access_at,
        }
    }
}

/// Acknowledgement of a soft delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub code: String,
}

/// Query parameters for the owner listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub created_by: String,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// A single record in an owner listing.
#[derive(Debug, Serialize)]
pub struct UrlSummary {
    pub code: String,
    pub short_url: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,
}

impl UrlSummary {
    pub fn from_record(record: ShortUrl, base_url: &str) -> Self {
        Self {
            short_url: format!("{}/{}", base_url, record.code),
            code: record.code,
            long_url: record.long_url,
            created_at: record.created_at,
            expire_at: record.expire_at,
        }
    }
}

/// One page of an owner's records.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub urls: Vec<UrlSummary>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}
