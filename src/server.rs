//! HTTP server initialization and runtime setup.
//!
//! Handles database and cache connections, background task spawning, and the
//! Axum server lifecycle with a bounded graceful drain.

use crate::api::middleware::admission::{AdmissionConfig, AdmissionControl, SWEEP_INTERVAL};
use crate::application::reaper::run_reaper;
use crate::application::services::{ShortenerService, UrlPolicy};
use crate::config::Config;
use crate::domain::repositories::UrlRepository;
use crate::infrastructure::cache::{NullCache, RedisCache, UrlCache};
use crate::infrastructure::persistence::PgUrlRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and pending migrations
/// - Redis cache (or [`NullCache`] fallback if Redis is unavailable or
///   unconfigured)
/// - Prometheus metrics recorder backing `/metrics`
/// - Background reaper and limiter-table sweeper
/// - Axum HTTP server with graceful shutdown on `SIGTERM` / `Ctrl-C`
///
/// # Shutdown
///
/// On a shutdown signal the server stops accepting new connections and
/// in-flight requests drain, bounded by `SERVER_SHUTDOWN_TIMEOUT`. The reaper
/// and sweeper stop afterwards, then the store pool closes.
///
/// # Errors
///
/// Returns an error if the database connection, migration, or server bind
/// fails.
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_open_conns)
        .min_connections(config.db_max_idle_conns)
        .max_lifetime(Duration::from_secs(config.db_conn_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    let cache: Arc<dyn UrlCache> = if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(
            redis_url,
            config.cache_ttl,
            config.cache_negative_ttl,
            config.redis_max_retries,
        )
        .await
        {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        }
    } else {
        tracing::info!("Cache disabled (NullCache)");
        Arc::new(NullCache::new())
    };

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    let pool = Arc::new(pool);
    let repository: Arc<dyn UrlRepository> = Arc::new(PgUrlRepository::new(pool.clone()));

    let shortener = Arc::new(ShortenerService::new(
        repository.clone(),
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

    let reaper_handle = tokio::spawn(run_reaper(
        shortener.clone(),
        Duration::from_secs(config.reaper_interval),
    ));
    let sweeper_handle = tokio::spawn(admission.clone().run_sweeper(SWEEP_INTERVAL));

    let state = AppState::new(shortener, repository, cache, admission, metrics_handle);
    let app = app_router(state, &config);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    // The watch channel lets the drain phase race against the shutdown bound.
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut drain_rx = shutdown_rx.clone();
    let serve = axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(async move {
        let _ = drain_rx.changed().await;
    })
    .into_future();
    tokio::pin!(serve);

    let grace = Duration::from_secs(config.shutdown_timeout);
    tokio::select! {
        result = &mut serve => result?,
        _ = async {
            let _ = shutdown_rx.changed().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                timeout_secs = config.shutdown_timeout,
                "Graceful drain exceeded shutdown timeout, aborting in-flight requests"
            );
        }
    }

    tracing::info!("HTTP server stopped, stopping background tasks");
    reaper_handle.abort();
    sweeper_handle.abort();

    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C (all platforms) or SIGTERM (Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
