//! DTOs for administrative endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Acknowledgement of a manually triggered cleanup batch.
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
