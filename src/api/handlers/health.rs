//! Handlers for liveness and readiness endpoints.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::api::dto::health::{HealthResponse, ServiceChecks};
use crate::state::AppState;

/// Returns service liveness with per-dependency status.
///
/// # Endpoint
///
/// `GET /healthz`
///
/// Always responds **200**; consumers inspect `status` (`healthy` or
/// `degraded`) and the per-service fields. A degraded cache is expected
/// operation (the store absorbs the traffic), so it never fails liveness.
pub async fn healthz_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.repository.ping().await {
        Ok(()) => "ok",
        Err(_) => "error",
    };
    let cache = if state.cache.health_check().await {
        "ok"
    } else {
        "error"
    };

    let status = if database == "ok" && cache == "ok" {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        timestamp: Utc::now(),
        services: ServiceChecks { database, cache },
    })
}

/// Readiness probe.
///
/// # Endpoint
///
/// `GET /readyz`
///
/// Ready (**200**) once the store answers; the cache tier is optional for
/// serving traffic. Responds **503** while the store is unreachable.
pub async fn readyz_handler(State(state): State<AppState>) -> StatusCode {
    match state.repository.ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
