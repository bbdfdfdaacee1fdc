//! Handler for the shorten endpoint.

use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::application::services::CreateRequest;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short URL.
///
/// # Endpoint
///
/// `POST /api/v1/shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com/some/long/path",
///   "custom_alias": "promo2024",
///   "expire_at": "2030-01-01T00:00:00Z",
///   "created_by": "svc-marketing",
///   "metadata": "{\"campaign\":\"q1\"}"
/// }
/// ```
///
/// Only `url` is required.
///
/// # Responses
///
/// - **201 Created** with the committed record
/// - **400** `invalid_url` / `url_too_long` / `invalid_request`
/// - **403** `url_blocked`
/// - **409** `alias_exists`
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let created = state
        .shortener
        .create(CreateRequest {
            long_url: payload.url,
            custom_alias: payload.custom_alias,
            expire_at: payload.expire_at,
            created_by: payload.created_by,
            metadata: payload.metadata.map(serde_json::Value::String),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse {
            code: created.code,
            short_url: created.short_url,
            long_url: created.long_url,
            expire_at: created.expire_at,
            created_at: created.created_at,
        }),
    ))
}
