//! Top-level router configuration.

use axum::routing::{get, post};
use axum::{Router, middleware};
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::timeout::TimeoutLayer;

use crate::api::handlers::{
    cleanup_handler, delete_handler, healthz_handler, list_urls_handler, metadata_handler,
    metrics_handler, readyz_handler, redirect_handler, shorten_handler,
};
use crate::api::middleware::{admission, tracing};
use crate::config::Config;
use crate::state::AppState;
use std::time::Duration;

/// Constructs the application router with all routes and middleware.
///
/// # Route Structure
///
/// - `/{code}` - Redirect endpoint (public, admission-controlled)
/// - `/api/v1/*` - REST API (admission-controlled)
/// - `/healthz`, `/readyz`, `/metrics` - Operational endpoints, never
///   admission-controlled so probes and scrapes survive overload
///
/// # Middleware Layers
///
/// - Tracing - request/response logging
/// - Admission - global + per-client token buckets on the public surface
/// - CORS + request timeout - per configuration
/// - Path normalization - trailing slash handling
pub fn api_router(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/urls", get(list_urls_handler))
        .route(
            "/urls/{code}",
            get(metadata_handler).delete(delete_handler),
        )
        .route("/admin/cleanup", post(cleanup_handler));

    let public = Router::new()
        .route("/{code}", get(redirect_handler))
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission::admission_middleware,
        ));

    let ops = Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public)
        .merge(ops)
        .with_state(state)
        .layer(tracing::layer())
        .layer(cors_layer(&config.allowed_origins))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout,
        )))
}

/// Wraps the router with trailing-slash normalization for serving.
pub fn app_router(state: AppState, config: &Config) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(api_router(state, config))
}

/// Builds the CORS layer from the configured origins.
///
/// An empty list keeps the restrictive default; `*` opens to any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any);
    }

    let origins: Vec<axum::http::HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
    } else {
        CorsLayer::new().allow_origin(origins).allow_methods(Any)
    }
}
