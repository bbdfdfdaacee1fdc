//! Lookup and mutation service: the orchestration core.
//!
//! Coordinates the code generator, the durable store, and the cache tier for
//! creates, redirects, deletes, metadata reads, and expiry cleanup. The cache
//! is never authoritative: any cache failure degrades to a store lookup, and
//! cache-write failures are logged, not surfaced.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

use crate::domain::entities::{NewClick, NewShortUrl, ShortUrl, UrlMetadata};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheLookup, CachedUrl, UrlCache};
use crate::utils::analytics::device_type;
use crate::utils::code_generator;
use crate::utils::url_policy::validate_long_url;

/// Collision-retry budget for generated codes.
const MAX_GENERATE_ATTEMPTS: usize = 10;

/// Rows reconciled per cleanup batch.
pub const REAP_BATCH_SIZE: i64 = 100;

/// Deadline for the detached click record after a cache hit. The task runs on
/// its own context so a client disconnect never cancels analytics.
const CLICK_RECORD_DEADLINE: Duration = Duration::from_secs(5);

/// URL acceptance policy applied before any store access.
#[derive(Debug, Clone, Default)]
pub struct UrlPolicy {
    pub max_url_length: usize,
    /// When non-empty, a URL's host must substring-match one entry.
    pub allowed_hosts: Vec<String>,
    /// A URL's host must not substring-match any entry.
    pub blocked_domains: Vec<String>,
}

/// Validated inputs for creating a short URL.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub long_url: String,
    pub custom_alias: Option<String>,
    pub expire_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// The committed record returned from a create.
#[derive(Debug, Clone)]
pub struct CreatedUrl {
    pub code: String,
    pub short_url: String,
    pub long_url: String,
    pub expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Analytics hints extracted by the adapter for a redirect.
#[derive(Debug, Clone, Default)]
pub struct ResolveHints {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referer: Option<String>,
    pub country: Option<String>,
}

/// One page of a principal's records.
#[derive(Debug, Clone)]
pub struct OwnerPage {
    pub urls: Vec<ShortUrl>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Service coordinating create, resolve, delete, metadata, and cleanup.
pub struct ShortenerService {
    repository: Arc<dyn UrlRepository>,
    cache: Arc<dyn UrlCache>,
    base_url: String,
    code_length: usize,
    policy: UrlPolicy,
}

impl ShortenerService {
    /// Creates a new service.
    ///
    /// `base_url` is the public prefix for `short_url` values;
    /// `code_length` is the generated code length (4..=16).
    pub fn new(
        repository: Arc<dyn UrlRepository>,
        cache: Arc<dyn UrlCache>,
        base_url: String,
        code_length: usize,
        policy: UrlPolicy,
    ) -> Self {
        Self {
            repository,
            cache,
            base_url: base_url.trim_end_matches('/').to_string(),
            code_length,
            policy,
        }
    }

    /// The public base URL records are published under.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates a short URL.
    ///
    /// # Flow
    ///
    /// 1. Pure pre-validation: length, absolute http(s) parse, host policy
    /// 2. Code acquisition: derive the custom alias (conflict ⇒
    ///    `alias_exists`) or generate with up to 10 collision retries
    /// 3. Persist, then warm the cache best-effort
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] - malformed or over-long URL
    /// - [`AppError::Forbidden`] - host policy rejection
    /// - [`AppError::Conflict`] - custom alias already bound
    /// - [`AppError::Internal`] - store failure or generator exhaustion
    pub async fn create(&self, request: CreateRequest) -> Result<CreatedUrl, AppError> {
        validate_long_url(
            &request.long_url,
            self.policy.max_url_length,
            &self.policy.allowed_hosts,
            &self.policy.blocked_domains,
        )?;

        if let Some(expire_at) = request.expire_at
            && expire_at <= Utc::now()
        {
            return Err(AppError::invalid_request("expire_at must be in the future"));
        }

        let alias = request
            .custom_alias
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());

        let record = match alias {
            Some(alias) => self.create_with_alias(alias, &request).await?,
            None => self.create_generated(&request).await?,
        };

        // A tombstone left by earlier misses is overwritten here.
        if let Err(e) = self
            .cache
            .set(&record.code, &CachedUrl::from_record(&record))
            .await
        {
            warn!(code = %record.code, error = %e, "Failed to warm cache after create");
        }

        metrics::counter!("urls_created_total").increment(1);

        Ok(CreatedUrl {
            short_url: format!("{}/{}", self.base_url, record.code),
            code: record.code,
            long_url: record.long_url,
            expire_at: record.expire_at,
            created_at: record.created_at,
        })
    }

    /// Resolves a code to its long URL for the redirect hot path.
    ///
    /// Cache hits schedule the click record on a detached task and return
    /// immediately; cache-negative outcomes return `Gone` without touching
    /// the store; misses and cache failures fall through to the store, warm
    /// the cache, and record the click synchronously (best effort).
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] - no row for the code
    /// - [`AppError::Gone`] - row deleted (`url_deleted`) or past expiry
    ///   (`url_expired`)
    /// - [`AppError::Internal`] - store failure
    pub async fn resolve(&self, code: &str, hints: ResolveHints) -> Result<String, AppError> {
        // Codes that fail shape validation cannot exist in the store.
        if !code_generator::validate(code) {
            return Err(AppError::url_not_found("No such short URL"));
        }

        match self.cache.get(code).await {
            Ok(CacheLookup::Hit(entry)) => {
                if let Some(long_url) = entry.long_url {
                    self.spawn_click_record(code, &hints);
                    return Ok(long_url);
                }
                // A positive entry without a URL is malformed; fall through.
                debug!(code, "Positive cache entry missing long_url");
            }
            Ok(CacheLookup::NotFound) => {
                return Err(AppError::url_not_found("No such short URL"));
            }
            Ok(CacheLookup::Deleted) => {
                return Err(AppError::url_deleted("This short URL has been deleted"));
            }
            Ok(CacheLookup::Expired) => {
                return Err(AppError::url_expired("This short URL has expired"));
            }
            Ok(CacheLookup::Miss) => {}
            Err(e) => {
                warn!(code, error = %e, "Cache lookup failed, falling back to store");
                metrics::counter!("cache_fallbacks_total").increment(1);
            }
        }

        let Some(record) = self.repository.find_by_code(code).await? else {
            if let Err(e) = self.cache.set_negative(code).await {
                debug!(code, error = %e, "Failed to write negative cache entry");
            }
            return Err(AppError::url_not_found("No such short URL"));
        };

        if record.is_deleted {
            // Tombstone the code so hot deleted links stop reaching the store.
            // The entry keeps its URL, marking "deleted" rather than "absent".
            if let Err(e) = self.cache.set(code, &CachedUrl::from_record(&record)).await {
                debug!(code, error = %e, "Failed to write deleted cache entry");
            }
            return Err(AppError::url_deleted("This short URL has been deleted"));
        }

        if record.is_expired() {
            // No cache warm: the reaper will tombstone the row shortly.
            return Err(AppError::url_expired("This short URL has expired"));
        }

        if let Err(e) = self.cache.set(code, &CachedUrl::from_record(&record)).await {
            warn!(code, error = %e, "Failed to warm cache after store lookup");
        }

        // Synchronous on the miss path; errors are logged, never surfaced.
        let click = build_click(code, &hints);
        if let Err(e) = self.repository.record_click(click).await {
            warn!(code, error = %e, "Failed to record click");
        }

        Ok(record.long_url)
    }

    /// Soft-deletes a code, then drops its cache entry best-effort.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when no live row matches, including
    /// re-deletes of an already-deleted code.
    pub async fn delete(&self, code: &str) -> Result<(), AppError> {
        if !self.repository.soft_delete(code).await? {
            return Err(AppError::url_not_found("No such short URL"));
        }

        // Failure here leaves a stale entry that the clipped TTL bounds.
        if let Err(e) = self.cache.delete(code).await {
            warn!(code, error = %e, "Failed to invalidate cache after delete");
        }

        metrics::counter!("urls_deleted_total").increment(1);
        Ok(())
    }

    /// Fetches a record joined with its click statistics.
    ///
    /// # Errors
    ///
    /// Same classification as [`Self::resolve`]: absent ⇒ `url_not_found`,
    /// deleted ⇒ `url_deleted`, expired ⇒ `url_expired`.
    pub async fn metadata(&self, code: &str) -> Result<UrlMetadata, AppError> {
        let meta = self
            .repository
            .get_metadata(code)
            .await?
            .ok_or_else(|| AppError::url_not_found("No such short URL"))?;

        if meta.is_deleted {
            return Err(AppError::url_deleted("This short URL has been deleted"));
        }
        if meta.is_expired() {
            return Err(AppError::url_expired("This short URL has expired"));
        }

        Ok(meta)
    }

    /// Lists a principal's live records with pagination.
    pub async fn list_by_owner(
        &self,
        created_by: &str,
        page: i64,
        page_size: i64,
    ) -> Result<OwnerPage, AppError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);

        let (urls, total) = self
            .repository
            .list_by_owner(created_by, page, page_size)
            .await?;

        Ok(OwnerPage {
            urls,
            total,
            page,
            page_size,
        })
    }

    /// Reconciles one batch of expired rows to the soft-deleted state and
    /// invalidates their cache entries. Returns the number of rows flipped.
    ///
    /// Store errors abort the batch; cache invalidation is best-effort (stale
    /// entries self-expire via the clipped TTL).
    pub async fn cleanup_expired(&self) -> Result<u64, AppError> {
        let codes = self.repository.select_expired(REAP_BATCH_SIZE).await?;
        if codes.is_empty() {
            return Ok(0);
        }

        let flipped = self.repository.bulk_soft_delete(&codes).await?;

        if let Err(e) = self.cache.invalidate_many(&codes).await {
            warn!(count = codes.len(), error = %e, "Failed to invalidate reaped codes");
        }

        metrics::counter!("urls_reaped_total").increment(flipped);
        Ok(flipped)
    }

    /// Creates a record under a derived custom alias.
    async fn create_with_alias(
        &self,
        alias: &str,
        request: &CreateRequest,
    ) -> Result<ShortUrl, AppError> {
        let code = code_generator::derive(alias, self.code_length);

        if self.code_exists(&code).await? {
            return Err(AppError::alias_exists(format!(
                "The alias '{}' is already taken",
                code
            )));
        }

        match self.repository.create(new_record(code.clone(), true, request)).await {
            Ok(record) => Ok(record),
            // Lost a cross-process race for the alias.
            Err(e) if e.is_conflict() => Err(AppError::alias_exists(format!(
                "The alias '{}' is already taken",
                code
            ))),
            Err(e) => Err(e),
        }
    }

    /// Creates a record under a generated code with collision retry.
    ///
    /// A unique-key conflict on a freshly generated code is a generator
    /// collision and retries within the loop; exhaustion surfaces as
    /// `code_exhaustion`.
    async fn create_generated(&self, request: &CreateRequest) -> Result<ShortUrl, AppError> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let code = code_generator::generate(self.code_length);

            if self.code_exists(&code).await? {
                metrics::counter!("code_collisions_total", "stage" => "lookup").increment(1);
                continue;
            }

            match self.repository.create(new_record(code, false, request)).await {
                Ok(record) => return Ok(record),
                Err(e) if e.is_conflict() => {
                    metrics::counter!("code_collisions_total", "stage" => "insert").increment(1);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::code_exhaustion(
            "Failed to generate a unique code, too many collisions",
        ))
    }

    /// Checks code existence through the cache, then the store.
    ///
    /// Deleted and expired entries mean the code is bound (a soft-deleted row
    /// still owns its code); a "no such code" tombstone may be stale, so it
    /// falls through to the store like a miss. Cache failures degrade to the
    /// store lookup.
    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        match self.cache.get(code).await {
            Ok(CacheLookup::Hit(_) | CacheLookup::Deleted | CacheLookup::Expired) => {
                return Ok(true);
            }
            Ok(CacheLookup::Miss | CacheLookup::NotFound) => {}
            Err(e) => {
                debug!(code, error = %e, "Cache existence check failed, using store");
            }
        }

        Ok(self.repository.find_by_code(code).await?.is_some())
    }

    /// Schedules the click record on a detached task with its own deadline,
    /// retrying transient store errors with exponential backoff.
    fn spawn_click_record(&self, code: &str, hints: &ResolveHints) {
        let repository = self.repository.clone();
        let click = build_click(code, hints);
        let code = code.to_string();

        tokio::spawn(async move {
            let strategy = ExponentialBackoff::from_millis(100).take(4);

            let op = || {
                let repository = repository.clone();
                let click = click.clone();
                async move { repository.record_click(click).await }
            };

            let outcome =
                tokio::time::timeout(CLICK_RECORD_DEADLINE, RetryIf::spawn(strategy, op, is_transient_error))
                    .await;

            match outcome {
                Ok(Ok(())) => {
                    metrics::counter!("clicks_recorded_total").increment(1);
                }
                Ok(Err(e)) => {
                    metrics::counter!("clicks_dropped_total").increment(1);
                    warn!(code, error = %e, "Failed to record click after retries");
                }
                Err(_) => {
                    metrics::counter!("clicks_dropped_total").increment(1);
                    warn!(code, "Click record timed out");
                }
            }
        });
    }
}

/// Returns `true` for transient errors worth retrying (e.g. connection loss).
fn is_transient_error(e: &AppError) -> bool {
    matches!(e, AppError::Internal { .. })
}

fn new_record(code: String, custom_alias: bool, request: &CreateRequest) -> NewShortUrl {
    NewShortUrl {
        code,
        long_url: request.long_url.clone(),
        expire_at: request.expire_at,
        custom_alias,
        created_by: request.created_by.clone(),
        metadata: request.metadata.clone(),
    }
}

fn build_click(code: &str, hints: &ResolveHints) -> NewClick {
    NewClick {
        code: code.to_string(),
        user_agent: hints.user_agent.clone(),
        ip_address: hints.ip_address.clone(),
        referer: hints.referer.clone(),
        country: hints.country.clone(),
        device_type: hints.user_agent.as_deref().map(|ua| device_type(ua).to_string()),
    }
}
