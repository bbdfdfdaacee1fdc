//! Handlers for administrative endpoints.

use axum::{Json, extract::State};
use chrono::Utc;

use crate::api::dto::admin::CleanupResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Manually triggers one expiry cleanup batch.
///
/// # Endpoint
///
/// `POST /api/v1/admin/cleanup`
///
/// Runs the same reconciliation the reaper performs on its interval: select
/// expired live rows, flip them to soft-deleted, invalidate their cache
/// entries.
///
/// # Errors
///
/// - **500** `cleanup_failed` when the batch aborts on a store error
pub async fn cleanup_handler(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, AppError> {
    let reaped = state
        .shortener
        .cleanup_expired()
        .await
        .map_err(|e| AppError::cleanup_failed(format!("Cleanup batch failed: {}", e)))?;

    Ok(Json(CleanupResponse {
        message: format!("Cleanup completed, {} expired URLs removed", reaped),
        timestamp: Utc::now(),
    }))
}
