//! Handlers for short URL management: metadata, deletion, owner listing.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::api::dto::urls::{
    DeleteResponse, ListQuery, ListResponse, MetadataResponse, UrlSummary,
};
use crate::error::AppError;
use crate::state::AppState;

/// Returns metadata and click statistics for a short URL.
///
/// # Endpoint
///
/// `GET /api/v1/urls/{code}`
///
/// # Errors
///
/// - **404** `url_not_found`
/// - **410** `url_deleted` / `url_expired`
pub async fn metadata_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MetadataResponse>, AppError> {
    let meta = state.shortener.metadata(&code).await?;
    Ok(Json(MetadataResponse::from(meta)))
}

/// Soft-deletes a short URL.
///
/// # Endpoint
///
/// `DELETE /api/v1/urls/{code}`
///
/// Deleting an already-deleted code returns **404**: the read guard excludes
/// tombstoned rows, so a second delete sees nothing to remove.
pub async fn delete_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.shortener.delete(&code).await?;

    Ok(Json(DeleteResponse {
        message: "Short URL deleted".to_string(),
        code,
    }))
}

/// Lists a principal's live short URLs.
///
/// # Endpoint
///
/// `GET /api/v1/urls?created_by=<principal>&page=1&page_size=20`
pub async fn list_urls_handler(
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse>, AppError> {
    if query.created_by.is_empty() {
        return Err(AppError::invalid_request("created_by must not be empty"));
    }

    let page = state
        .shortener
        .list_by_owner(
            &query.created_by,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(20),
        )
        .await?;

    let base_url = state.shortener.base_url().to_string();
    Ok(Json(ListResponse {
        urls: page
            .urls
            .into_iter()
            .map(|record| UrlSummary::from_record(record, &base_url))
            .collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}
