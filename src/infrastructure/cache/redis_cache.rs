//! Redis-backed cache implementation.

use super::service::{CacheError, CacheLookup, CacheResult, CachedUrl, UrlCache, effective_ttl};
use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Client, aio::ConnectionManager, aio::ConnectionManagerConfig};
use tracing::{debug, info, warn};

/// Redis cache for the redirect hot path.
///
/// Uses a multiplexed `ConnectionManager` for connection reuse and automatic
/// reconnection. Entries are JSON-serialized [`CachedUrl`] values under keys
/// prefixed with `url:`; no other component writes that prefix.
pub struct RedisCache {
    conn: ConnectionManager,
    positive_ttl: u64,
    negative_ttl: u64,
    key_prefix: &'static str,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Connection string (e.g., "redis://localhost:6379")
    /// - `positive_ttl` - TTL in seconds for records of live URLs
    /// - `negative_ttl` - TTL in seconds for "no such code" tombstones
    /// - `max_retries` - Command retry budget for the connection manager
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the URL is malformed, the
    /// connection cannot be established, or PING fails.
    pub async fn connect(
        redis_url: &str,
        positive_ttl: u64,
        negative_ttl: u64,
        max_retries: u32,
    ) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let config = ConnectionManagerConfig::new().set_number_of_retries(max_retries as usize);

        let manager = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::Connection(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            conn: manager,
            positive_ttl,
            negative_ttl,
            key_prefix: "url:",
        })
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, code: &str) -> String {
        format!("{}{}", self.key_prefix, code)
    }
}

#[async_trait]
impl UrlCache for RedisCache {
    async fn get(&self, code: &str) -> CacheResult<CacheLookup> {
        let key = self.build_key(code);
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| CacheError::Operation(format!("GET {}: {}", key, e)))?;

        let Some(raw) = raw else {
            debug!(code, "Cache MISS");
            metrics::counter!("cache_misses_total").increment(1);
            return Ok(CacheLookup::Miss);
        };

        let entry: CachedUrl = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                // An undecodable entry is treated as absent rather than fatal.
                warn!(code, error = %e, "Dropping undecodable cache entry");
                let _: Result<i64, _> = conn.del(&key).await;
                return Ok(CacheLookup::Miss);
            }
        };

        let lookup = entry.classify();
        match &lookup {
            CacheLookup::Hit(_) => {
                metrics::counter!("cache_hits_total", "kind" => "positive").increment(1);
            }
            CacheLookup::NotFound | CacheLookup::Deleted => {
                debug!(code, "Cache tombstone");
                metrics::counter!("cache_hits_total", "kind" => "negative").increment(1);
            }
            CacheLookup::Expired => {
                debug!(code, "Cache entry past expiry");
                metrics::counter!("cache_hits_total", "kind" => "expired").increment(1);
            }
            CacheLookup::Miss => {}
        }
        Ok(lookup)
    }

    async fn set(&self, code: &str, entry: &CachedUrl) -> CacheResult<()> {
        let ttl = if entry.is_deleted {
            // Deleted-record tombstones live on the negative clock.
            self.negative_ttl
        } else {
            match effective_ttl(entry, self.positive_ttl, Utc::now()) {
                Some(ttl) => ttl,
                None => {
                    debug!(code, "Skipping cache of already-expired entry");
                    return Ok(());
                }
            }
        };

        let key = self.build_key(code);
        let value = serde_json::to_string(entry)?;
        let mut conn = self.conn.clone();

        conn.set_ex::<_, _, ()>(&key, value, ttl)
            .await
            .map_err(|e| CacheError::Operation(format!("SETEX {}: {}", key, e)))?;

        debug!(code, ttl, "Cache SET");
        Ok(())
    }

    async fn set_negative(&self, code: &str) -> CacheResult<()> {
        let key = self.build_key(code);
        let value = serde_json::to_string(&CachedUrl::negative())?;
        let mut conn = self.conn.clone();

        conn.set_ex::<_, _, ()>(&key, value, self.negative_ttl)
            .await
            .map_err(|e| CacheError::Operation(format!("SETEX {}: {}", key, e)))?;

        debug!(code, ttl = self.negative_ttl, "Cache SET negative");
        metrics::counter!("cache_negative_sets_total").increment(1);
        Ok(())
    }

    async fn delete(&self, code: &str) -> CacheResult<()> {
        let key = self.build_key(code);
        let mut conn = self.conn.clone();

        let deleted: i64 = conn
            .del(&key)
            .await
            .map_err(|e| CacheError::Operation(format!("DEL {}: {}", key, e)))?;

        if deleted > 0 {
            debug!(code, "Cache INVALIDATE");
        }
        Ok(())
    }

    async fn invalidate_many(&self, codes: &[String]) -> CacheResult<()> {
        if codes.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for code in codes {
            pipe.del(self.build_key(code)).ignore();
        }

        let mut conn = self.conn.clone();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Operation(format!("pipelined DEL: {}", e)))?;

        debug!(count = codes.len(), "Cache batch INVALIDATE");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.conn.clone();
        conn.ping::<()>().await.is_ok()
    }
}
