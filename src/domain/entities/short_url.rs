//! Short URL entity: the authoritative code → long URL mapping.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// An authoritative short URL record.
///
/// `expire_at` is an exclusive upper bound on liveness and is immutable once
/// set. `is_deleted` only ever transitions false → true.
#[derive(Debug, Clone, FromRow)]
pub struct ShortUrl {
    pub id: i64,
    pub code: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    pub expire_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub custom_alias: bool,
    pub created_by: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl ShortUrl {
    /// Returns true if the record has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.expire_at.is_some_and(|e| Utc::now() >= e)
    }

    /// A record is live iff it is neither soft-deleted nor expired.
    pub fn is_live(&self) -> bool {
        !self.is_deleted && !self.is_expired()
    }
}

/// Input data for creating a new short URL.
#[derive(Debug, Clone)]
pub struct NewShortUrl {
    pub code: String,
    pub long_url: String,
    pub expire_at: Option<DateTime<Utc>>,
    pub custom_alias: bool,
    pub created_by: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// A short URL joined with its aggregated click statistics.
#[derive(Debug, Clone, FromRow)]
pub struct UrlMetadata {
    pub code: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    pub expire_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub custom_alias: bool,
    pub created_by: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub total_clicks: i64,
    pub first_access_at: Option<DateTime<Utc>>,
    pub last_access_at: Option<DateTime<Utc>>,
}

impl UrlMetadata {
    /// Returns true if the record has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.expire_at.is_some_and(|e| Utc::now() >= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expire_at: Option<DateTime<Utc>>, is_deleted: bool) -> ShortUrl {
        ShortUrl {
            id: 1,
            code: "abc12345".to_string(),
            long_url: "https://example.com".to_string(),
            created_at: Utc::now(),
            expire_at,
            is_deleted,
            custom_alias: false,
            created_by: None,
            metadata: None,
        }
    }

    #[test]
    fn test_live_without_expiry() {
        let url = record(None, false);
        assert!(!url.is_expired());
        assert!(url.is_live());
    }

    #[test]
    fn test_live_before_expiry() {
        let url = record(Some(Utc::now() + Duration::hours(1)), false);
        assert!(!url.is_expired());
        assert!(url.is_live());
    }

    #[test]
    fn test_expired_after_expiry() {
        let url = record(Some(Utc::now() - Duration::seconds(1)), false);
        assert!(url.is_expired());
        assert!(!url.is_live());
    }

    #[test]
    fn test_deleted_is_not_live() {
        let url = record(None, true);
        assert!(!url.is_expired());
        assert!(!url.is_live());
    }
}
