//! Cache service trait, entry format, and TTL policy.

use crate::domain::entities::ShortUrl;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Grace period added on top of `time_until_expiry` so a positively cached
/// record never outlives its row, while a `get` in the final TTL second does
/// not observe "live at store, expired at cache".
pub const EXPIRY_TTL_BUFFER_SECS: i64 = 60;

/// Errors that can occur during cache operations.
///
/// Every error from this tier is non-authoritative: the service degrades a
/// failed `get` to a miss and falls through to the durable store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache operation error: {0}")]
    Operation(String),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Serialized cache entry for a short code.
///
/// A *negative* entry (cached "no such code") has `is_deleted = true` and no
/// `long_url`; positive and negative entries share the key space and the
/// discriminant is the flag, not the key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedUrl {
    pub long_url: Option<String>,
    pub expire_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl CachedUrl {
    /// Builds a positive entry from an authoritative record.
    pub fn from_record(record: &ShortUrl) -> Self {
        Self {
            long_url: Some(record.long_url.clone()),
            expire_at: record.expire_at,
            is_deleted: record.is_deleted,
            created_at: record.created_at,
        }
    }

    /// Builds a negative (tombstone) entry.
    pub fn negative() -> Self {
        Self {
            long_url: None,
            expire_at: None,
            is_deleted: true,
            created_at: Utc::now(),
        }
    }

    /// Returns true if the cached record has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.expire_at.is_some_and(|e| Utc::now() >= e)
    }

    /// Classifies a stored entry into a lookup outcome.
    ///
    /// The `is_deleted` flag is the negative discriminant; whether the entry
    /// still carries a URL separates "the record was deleted" from "no such
    /// code was ever here".
    pub fn classify(self) -> CacheLookup {
        if self.is_deleted {
            if self.long_url.is_some() {
                CacheLookup::Deleted
            } else {
                CacheLookup::NotFound
            }
        } else if self.is_expired() {
            CacheLookup::Expired
        } else {
            CacheLookup::Hit(self)
        }
    }
}

/// Outcome of a cache lookup.
///
/// `Miss` ("key absent") is distinct from the three negative outcomes, which
/// carry a cached answer and must not fall through to the store: `NotFound`
/// is the "no such code" tombstone, `Deleted` and `Expired` are codes that
/// once existed.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CachedUrl),
    Miss,
    NotFound,
    Deleted,
    Expired,
}

/// Computes the effective TTL in seconds for a positive entry.
///
/// The TTL is `min(positive_ttl, time_until_expiry + buffer)`; entries whose
/// expiry has already passed get `None` and must not be written.
pub fn effective_ttl(entry: &CachedUrl, positive_ttl: u64, now: DateTime<Utc>) -> Option<u64> {
    match entry.expire_at {
        Some(expire_at) => {
            let until_expiry = (expire_at - now).num_seconds();
            if until_expiry <= 0 {
                return None;
            }
            Some(positive_ttl.min((until_expiry + EXPIRY_TTL_BUFFER_SECS) as u64))
        }
        None => Some(positive_ttl),
    }
}

/// Trait for caching short URL lookups.
///
/// Implementations must be thread-safe. Failures never disrupt the
/// application: the caller degrades to a database lookup.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed with TTL
///   clipping, tombstones, and pipelined invalidation
/// - [`crate::infrastructure::cache::NullCache`] - No-op for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlCache: Send + Sync {
    /// Looks up a short code.
    ///
    /// Classifies the stored entry per [`CachedUrl::classify`]; absent keys
    /// yield [`CacheLookup::Miss`].
    async fn get(&self, code: &str) -> CacheResult<CacheLookup>;

    /// Stores an entry.
    ///
    /// Live entries get the TTL clipped per [`effective_ttl`] and are skipped
    /// once already expired; deleted-record entries get the negative TTL.
    /// Overwrites any tombstone under the same key.
    async fn set(&self, code: &str, entry: &CachedUrl) -> CacheResult<()>;

    /// Stores a tombstone entry with the negative TTL, absorbing hot traffic
    /// to nonexistent codes without touching the store.
    async fn set_negative(&self, code: &str) -> CacheResult<()>;

    /// Removes the entry for a code.
    async fn delete(&self, code: &str) -> CacheResult<()>;

    /// Pipelined batch delete, used by the expiry reaper.
    async fn invalidate_many(&self, codes: &[String]) -> CacheResult<()>;

    /// Checks if the cache backend is reachable.
    async fn health_check(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(expire_in: Option<Duration>) -> CachedUrl {
        CachedUrl {
            long_url: Some("https://example.com".to_string()),
            expire_at: expire_in.map(|d| Utc::now() + d),
            is_deleted: false,
            created_at: Utc::now(),
        }
    }

    // ── TTL clipping ──────────────────────────────────────────────────────────

    #[test]
    fn test_ttl_without_expiry_uses_positive_ttl() {
        assert_eq!(effective_ttl(&entry(None), 86_400, Utc::now()), Some(86_400));
    }

    #[test]
    fn test_ttl_clipped_to_expiry_plus_buffer() {
        let e = entry(Some(Duration::seconds(120)));
        let ttl = effective_ttl(&e, 86_400, Utc::now()).unwrap();
        // 120s until expiry + 60s buffer, with a margin for clock movement.
        assert!((179..=180).contains(&ttl), "ttl was {}", ttl);
    }

    #[test]
    fn test_ttl_never_exceeds_positive_ttl() {
        let e = entry(Some(Duration::hours(48)));
        assert_eq!(effective_ttl(&e, 3600, Utc::now()), Some(3600));
    }

    #[test]
    fn test_ttl_skipped_when_already_expired() {
        let e = entry(Some(Duration::seconds(-5)));
        assert_eq!(effective_ttl(&e, 3600, Utc::now()), None);
    }

    // ── Entry round-trip ──────────────────────────────────────────────────────

    #[test]
    fn test_entry_round_trip() {
        let e = entry(Some(Duration::hours(1)));
        let json = serde_json::to_string(&e).unwrap();
        let back: CachedUrl = serde_json::from_str(&json).unwrap();

        assert_eq!(back.long_url, e.long_url);
        assert_eq!(back.is_deleted, e.is_deleted);
        // Timestamp precision must survive to the second.
        assert_eq!(
            back.created_at.timestamp(),
            e.created_at.timestamp()
        );
        assert_eq!(
            back.expire_at.unwrap().timestamp(),
            e.expire_at.unwrap().timestamp()
        );
    }

    #[test]
    fn test_negative_entry_shape() {
        let tombstone = CachedUrl::negative();
        assert!(tombstone.is_deleted);
        assert!(tombstone.long_url.is_none());

        let json = serde_json::to_string(&tombstone).unwrap();
        let back: CachedUrl = serde_json::from_str(&json).unwrap();
        assert!(back.is_deleted);
        assert!(back.long_url.is_none());
    }

    #[test]
    fn test_expired_classification() {
        assert!(entry(Some(Duration::seconds(-1))).is_expired());
        assert!(!entry(Some(Duration::seconds(60))).is_expired());
        assert!(!entry(None).is_expired());
    }

    #[test]
    fn test_classify_outcomes() {
        // Live entry.
        assert!(matches!(entry(None).classify(), CacheLookup::Hit(_)));

        // Positive entry past its expiry.
        assert_eq!(
            entry(Some(Duration::seconds(-1))).classify(),
            CacheLookup::Expired
        );

        // Deleted record keeps its URL and classifies as Deleted.
        let mut deleted = entry(None);
        deleted.is_deleted = true;
        assert_eq!(deleted.classify(), CacheLookup::Deleted);

        // Pure tombstone means "no such code".
        assert_eq!(CachedUrl::negative().classify(), CacheLookup::NotFound);
    }
}
