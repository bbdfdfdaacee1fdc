//! Cache tier: key → serialized entry with bounded TTLs and negative entries.

mod null_cache;
mod redis_cache;
mod service;

pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheLookup, CacheResult, CachedUrl, UrlCache, effective_ttl};

#[cfg(test)]
pub use service::MockUrlCache;
