#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::extract::ConnectInfo;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use std::time::Duration;

use shortlinkd::api::middleware::admission::{AdmissionConfig, AdmissionControl};
use shortlinkd::application::services::{ShortenerService, UrlPolicy};
use shortlinkd::config::Config;
use shortlinkd::domain::entities::{NewClick, NewShortUrl, ShortUrl, UrlMetadata};
use shortlinkd::domain::repositories::UrlRepository;
use shortlinkd::error::AppError;
use shortlinkd::infrastructure::cache::{
    CacheError, CacheLookup, CacheResult, CachedUrl, UrlCache, effective_ttl,
};
use shortlinkd::routes::api_router;
use shortlinkd::state::AppState;

// ── In-memory store ─────────────────────────────────────────────────────────

#[derive(Default)]
struct ClickStats {
    total: i64,
    first_access_at: Option<DateTime<Utc>>,
    last_access_at: Option<DateTime<Utc>>,
}

/// Hermetic `UrlRepository` over a mutex-guarded map, so handler tests run
/// without a live PostgreSQL.
#[derive(Default)]
pub struct InMemoryRepo {
    urls: Mutex<HashMap<String, ShortUrl>>,
    clicks: Mutex<Vec<NewClick>>,
    stats: Mutex<HashMap<String, ClickStats>>,
    next_id: AtomicI64,
    /// Counts store lookups, for asserting negative-cache suppression.
    pub lookups: AtomicUsize,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &str) -> Option<ShortUrl> {
        self.urls.lock().unwrap().get(code).cloned()
    }

    pub fn click_count(&self) -> usize {
        self.clicks.lock().unwrap().len()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Seeds a record directly, bypassing the service.
    pub fn insert(&self, record: ShortUrl) {
        self.urls.lock().unwrap().insert(record.code.clone(), record);
    }
}

#[async_trait]
impl UrlRepository for InMemoryRepo {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let mut urls = self.urls.lock().unwrap();
        if urls.contains_key(&new_url.code) {
            return Err(AppError::Conflict {
                code: "code_conflict",
                message: "Short code already exists".to_string(),
            });
        }

        let record = ShortUrl {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            code: new_url.code.clone(),
            long_url: new_url.long_url,
            created_at: Utc::now(),
            expire_at: new_url.expire_at,
            is_deleted: false,
            custom_alias: new_url.custom_alias,
            created_by: new_url.created_by,
            metadata: new_url.metadata,
        };
        urls.insert(new_url.code, record.clone());
        Ok(record)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.urls.lock().unwrap().get(code).cloned())
    }

    async fn get_metadata(&self, code: &str) -> Result<Option<UrlMetadata>, AppError> {
        let Some(record) = self.urls.lock().unwrap().get(code).cloned() else {
            return Ok(None);
        };

        let stats = self.stats.lock().unwrap();
        let stats = stats.get(code);
        Ok(Some(UrlMetadata {
            code: record.code,
            long_url: record.long_url,
            created_at: record.created_at,
            expire_at: record.expire_at,
            is_deleted: record.is_deleted,
            custom_alias: record.custom_alias,
            created_by: record.created_by,
            metadata: record.metadata,
            total_clicks: stats.map(|s| s.total).unwrap_or(0),
            first_access_at: stats.and_then(|s| s.first_access_at),
            last_access_at: stats.and_then(|s| s.last_access_at),
        }))
    }

    async fn soft_delete(&self, code: &str) -> Result<bool, AppError> {
        let mut urls = self.urls.lock().unwrap();
        match urls.get_mut(code) {
            Some(record) if !record.is_deleted => {
                record.is_deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_click(&self, click: NewClick) -> Result<(), AppError> {
        {
            let urls = self.urls.lock().unwrap();
            match urls.get(&click.code) {
                Some(record) if !record.is_deleted => {}
                // Deleted or unknown codes reject new events.
                _ => return Ok(()),
            }
        }

        let now = Utc::now();
        let mut stats = self.stats.lock().unwrap();
        let entry = stats.entry(click.code.clone()).or_default();
        entry.total += 1;
        entry.first_access_at.get_or_insert(now);
        entry.last_access_at = Some(now);

        self.clicks.lock().unwrap().push(click);
        Ok(())
    }

    async fn select_expired(&self, limit: i64) -> Result<Vec<String>, AppError> {
        let now = Utc::now();
        let urls = self.urls.lock().unwrap();
        let mut expired: Vec<(DateTime<Utc>, String)> = urls
            .values()
            .filter(|u| !u.is_deleted)
            .filter_map(|u| u.expire_at.filter(|e| *e < now).map(|e| (e, u.code.clone())))
            .collect();
        expired.sort();
        Ok(expired
            .into_iter()
            .take(limit as usize)
            .map(|(_, code)| code)
            .collect())
    }

    async fn bulk_soft_delete(&self, codes: &[String]) -> Result<u64, AppError> {
        let mut urls = self.urls.lock().unwrap();
        let mut flipped = 0;
        for code in codes {
            if let Some(record) = urls.get_mut(code)
                && !record.is_deleted
            {
                record.is_deleted = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn list_by_owner(
        &self,
        created_by: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<ShortUrl>, i64), AppError> {
        let urls = self.urls.lock().unwrap();
        let mut live: Vec<ShortUrl> = urls
            .values()
            .filter(|u| u.is_live() && u.created_by.as_deref() == Some(created_by))
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = live.len() as i64;
        let offset = ((page - 1) * page_size) as usize;
        let urls = live
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();
        Ok((urls, total))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

// ── In-memory cache ─────────────────────────────────────────────────────────

/// Hermetic `UrlCache` with a failure toggle for degradation tests.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, CachedUrl>>,
    /// When set, every operation fails with a connection error.
    pub broken: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.lock().unwrap().contains_key(code)
    }

    pub fn entry(&self, code: &str) -> Option<CachedUrl> {
        self.entries.lock().unwrap().get(code).cloned()
    }

    pub fn break_cache(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> CacheResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            Err(CacheError::Connection("cache is broken".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UrlCache for InMemoryCache {
    async fn get(&self, code: &str) -> CacheResult<CacheLookup> {
        self.check()?;

        let Some(entry) = self.entries.lock().unwrap().get(code).cloned() else {
            return Ok(CacheLookup::Miss);
        };

        Ok(entry.classify())
    }

    async fn set(&self, code: &str, entry: &CachedUrl) -> CacheResult<()> {
        self.check()?;

        if !entry.is_deleted && effective_ttl(entry, 86_400, Utc::now()).is_none() {
            return Ok(());
        }
        self.entries
            .lock()
            .unwrap()
            .insert(code.to_string(), entry.clone());
        Ok(())
    }

    async fn set_negative(&self, code: &str) -> CacheResult<()> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(code.to_string(), CachedUrl::negative());
        Ok(())
    }

    async fn delete(&self, code: &str) -> CacheResult<()> {
        self.check()?;
        self.entries.lock().unwrap().remove(code);
        Ok(())
    }

    async fn invalidate_many(&self, codes: &[String]) -> CacheResult<()> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        for code in codes {
            entries.remove(code);
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.broken.load(Ordering::SeqCst)
    }
}

// ── Test app assembly ───────────────────────────────────────────────────────

/// The metrics recorder is process-global; install it once per test binary.
fn metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install metrics recorder")
        })
        .clone()
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused/test".to_string(),
        redis_url: None,
        listen_addr: "127.0.0.1:0".to_string(),
        base_url: "http://sho.rt".to_string(),
        log_level: "info".to_string(),
        log_format: "text".to_string(),
        request_timeout: 30,
        shutdown_timeout: 5,
        db_max_open_conns: 5,
        db_max_idle_conns: 1,
        db_conn_max_lifetime: 300,
        redis_pool_size: 10,
        redis_min_idle_conns: 5,
        redis_max_retries: 3,
        cache_ttl: 86_400,
        cache_negative_ttl: 300,
        // Generous limits so admission never interferes unless a test
        // tightens them on purpose.
        rate_limit_global_rps: 1_000_000.0,
        rate_limit_per_ip_rps: 1_000_000.0,
        rate_limit_burst_size: 1_000_000.0,
        rate_limit_window_size: 600,
        allowed_origins: vec![],
        allowed_hosts: vec![],
        blocked_domains: vec![],
        max_url_length: 2048,
        code_length: 8,
        reaper_interval: 3600,
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub repo: Arc<InMemoryRepo>,
    pub cache: Arc<InMemoryCache>,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(test_config())
}

pub fn spawn_app_with(config: Config) -> TestApp {
    let repo = Arc::new(InMemoryRepo::new());
    let cache = Arc::new(InMemoryCache::new());

    let shortener = Arc::new(ShortenerService::new(
        repo.clone(),
        cache.clone(),
        config.base_url.clone(),
        config.code_length,
        UrlPolicy {
            max_url_length: config.max_url_length,
            allowed_hosts: config.allowed_hosts.clone(),
            blocked_domains: config.blocked_domains.clone(),
        },
    ));

    let admission = Arc::new(AdmissionControl::new(AdmissionConfig {
        global_rps: config.rate_limit_global_rps,
        per_client_rps: config.rate_limit_per_ip_rps,
        burst: config.rate_limit_burst_size,
        idle_eviction: Duration::from_secs(config.rate_limit_window_size),
    }));

    let state = AppState::new(
        shortener,
        repo.clone(),
        cache.clone(),
        admission,
        metrics_handle(),
    );

    let app = api_router(state, &config).layer(MockConnectInfoLayer);
    let server = TestServer::new(app).unwrap();

    TestApp {
        server,
        repo,
        cache,
    }
}

// ── ConnectInfo injection ───────────────────────────────────────────────────
//
// TestServer drives the router without a TCP peer, so the transport address
// is injected the way a real listener would.

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> tower::Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Builds a `Router` for a custom state, used by admission tests that need
/// their own limits.
pub fn router_for(state: AppState, config: &Config) -> Router {
    api_router(state, config).layer(MockConnectInfoLayer)
}
