//! Handler for the metrics scrape endpoint.

use axum::extract::State;

use crate::state::AppState;

/// Renders the Prometheus exposition.
///
/// # Endpoint
///
/// `GET /metrics` (no API prefix)
pub async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
