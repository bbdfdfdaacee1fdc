//! Repository trait for short URL data access.

use crate::domain::entities::{NewClick, NewShortUrl, ShortUrl, UrlMetadata};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for the authoritative URL store.
///
/// All operations run under the caller's cancellation scope and either
/// succeed, fail with a classified [`AppError`], or fail fatally
/// ([`AppError::Internal`]).
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Inserts a new short URL, assigning `id` and `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the code is already bound (unique
    /// violation) and [`AppError::Internal`] on other database errors.
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError>;

    /// Finds a record by its short code.
    ///
    /// Deleted and expired rows are returned as-is; the service layer decides
    /// how each state surfaces (expiry observation is read-only, the reaper
    /// performs the writeback).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Fetches a record joined with its click statistics.
    ///
    /// Same deleted/expired semantics as [`Self::find_by_code`]. Records
    /// without any clicks report zero totals and empty access timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn get_metadata(&self, code: &str) -> Result<Option<UrlMetadata>, AppError>;

    /// Soft-deletes a record by setting `is_deleted = TRUE`.
    ///
    /// Returns `Ok(true)` if a live-or-expired row was flipped, `Ok(false)`
    /// if no row matched or it was already deleted (re-deletes surface as
    /// not-found to callers).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn soft_delete(&self, code: &str) -> Result<bool, AppError>;

    /// Appends a click event and updates aggregated stats in one transaction.
    ///
    /// Clicks against deleted codes are silently discarded (the append-only
    /// log rejects events for tombstoned rows).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn record_click(&self, click: NewClick) -> Result<(), AppError>;

    /// Returns up to `limit` codes of live rows whose expiry has passed.
    ///
    /// Ordering is deterministic within a scan (`expire_at, code`).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn select_expired(&self, limit: i64) -> Result<Vec<String>, AppError>;

    /// Soft-deletes the given set of codes in a single statement.
    ///
    /// Returns the number of rows flipped.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn bulk_soft_delete(&self, codes: &[String]) -> Result<u64, AppError>;

    /// Lists non-deleted records for a principal with pagination.
    ///
    /// `page` is 1-indexed. The returned total counts live rows only.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list_by_owner(
        &self,
        created_by: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<ShortUrl>, i64), AppError>;

    /// Cheap connectivity probe for health reporting.
    async fn ping(&self) -> Result<(), AppError>;
}
