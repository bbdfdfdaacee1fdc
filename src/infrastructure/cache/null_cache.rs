//! No-op cache implementation for testing or disabled caching.

use super::service::{CacheLookup, CacheResult, CachedUrl, UrlCache};
use async_trait::async_trait;
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Used when Redis is unavailable or caching is explicitly disabled. Every
/// lookup misses, so all resolves fall through to the durable store.
///
/// # Use Cases
///
/// - Development environments without Redis
/// - Testing scenarios where caching should be bypassed
/// - Fallback when the Redis connection fails at startup
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for NullCache {
    async fn get(&self, _code: &str) -> CacheResult<CacheLookup> {
        Ok(CacheLookup::Miss)
    }

    async fn set(&self, _code: &str, _entry: &CachedUrl) -> CacheResult<()> {
        Ok(())
    }

    async fn set_negative(&self, _code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate_many(&self, _codes: &[String]) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
