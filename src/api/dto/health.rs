//! DTOs for liveness and readiness endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Liveness report with per-dependency status.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when every dependency reports ok, `degraded` otherwise.
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceChecks,
}

/// Status of each backing service.
#[derive(Debug, Serialize)]
pub struct ServiceChecks {
    pub database: &'static str,
    pub cache: &'static str,
}
