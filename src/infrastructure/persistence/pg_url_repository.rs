//! PostgreSQL implementation of the URL repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewClick, NewShortUrl, ShortUrl, UrlMetadata};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;

/// PostgreSQL repository for short URL storage, analytics, and expiry scans.
///
/// Uses bound-parameter queries with `FromRow` mapping for SQL injection
/// protection. Click events and aggregated stats are maintained in a single
/// transaction so `total_clicks` always equals the event count.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

const RECORD_COLUMNS: &str =
    "id, code, long_url, created_at, expire_at, is_deleted, custom_alias, created_by, metadata";

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let record = sqlx::query_as::<_, ShortUrl>(&format!(
            r#"
            INSERT INTO short_urls (code, long_url, expire_at, custom_alias, created_by, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(&new_url.code)
        .bind(&new_url.long_url)
        .bind(new_url.expire_at)
        .bind(new_url.custom_alias)
        .bind(&new_url.created_by)
        .bind(&new_url.metadata)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError> {
        // Does NOT filter is_deleted or expiry: the service classifies the
        // row's state, and expiry observation stays read-only here.
        let record = sqlx::query_as::<_, ShortUrl>(&format!(
            "SELECT {RECORD_COLUMNS} FROM short_urls WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn get_metadata(&self, code: &str) -> Result<Option<UrlMetadata>, AppError> {
        let meta = sqlx::query_as::<_, UrlMetadata>(
            r#"
            SELECT
                u.code, u.long_url, u.created_at, u.expire_at, u.is_deleted,
                u.custom_alias, u.created_by, u.metadata,
                COALESCE(s.total_clicks, 0) AS total_clicks,
                s.first_access_at,
                s.last_access_at
            FROM short_urls u
            LEFT JOIN click_stats s ON s.code = u.code
            WHERE u.code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(meta)
    }

    async fn soft_delete(&self, code: &str) -> Result<bool, AppError> {
        // The guard makes re-deletes report zero rows, which surfaces as
        // not-found to callers.
        let result = sqlx::query(
            "UPDATE short_urls SET is_deleted = TRUE WHERE code = $1 AND is_deleted = FALSE",
        )
        .bind(code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_click(&self, click: NewClick) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Deleted codes reject new events; the guard keeps the append-only
        // log consistent with the tombstone.
        let inserted = sqlx::query(
            r#"
            INSERT INTO click_events (code, user_agent, ip_address, referer, country, device_type)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE EXISTS (
                SELECT 1 FROM short_urls WHERE code = $1 AND is_deleted = FALSE
            )
            "#,
        )
        .bind(&click.code)
        .bind(&click.user_agent)
        .bind(&click.ip_address)
        .bind(&click.referer)
        .bind(&click.country)
        .bind(&click.device_type)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO click_stats (code, total_clicks, first_access_at, last_access_at)
            VALUES ($1, 1, now(), now())
            ON CONFLICT (code) DO UPDATE SET
                total_clicks = click_stats.total_clicks + 1,
                first_access_at = COALESCE(click_stats.first_access_at, EXCLUDED.first_access_at),
                last_access_at = EXCLUDED.last_access_at
            "#,
        )
        .bind(&click.code)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn select_expired(&self, limit: i64) -> Result<Vec<String>, AppError> {
        // Ordering is deterministic within a scan; the partial expire_at
        // index keeps this bounded.
        let codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT code
            FROM short_urls
            WHERE is_deleted = FALSE
              AND expire_at IS NOT NULL
              AND expire_at < now()
            ORDER BY expire_at, code
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(codes)
    }

    async fn bulk_soft_delete(&self, codes: &[String]) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE short_urls SET is_deleted = TRUE WHERE code = ANY($1) AND is_deleted = FALSE",
        )
        .bind(codes)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_by_owner(
        &self,
        created_by: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<ShortUrl>, i64), AppError> {
        let offset = (page - 1) * page_size;

        let urls = sqlx::query_as::<_, ShortUrl>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM short_urls
            WHERE created_by = $1
              AND is_deleted = FALSE
              AND (expire_at IS NULL OR expire_at > now())
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(created_by)
        .bind(page_size)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM short_urls
            WHERE created_by = $1
              AND is_deleted = FALSE
              AND (expire_at IS NULL OR expire_at > now())
            "#,
        )
        .bind(created_by)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok((urls, total))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
