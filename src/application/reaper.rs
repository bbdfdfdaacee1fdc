//! Background reaper: periodic expiry reconciliation.
//!
//! A single task fires on a fixed interval and runs one cleanup batch:
//! expired live rows are flipped to soft-deleted and their cache entries
//! invalidated. The reaper owns no state; a failed batch is logged and
//! retried on the next tick. The interval trades freshness of the Gone
//! response against store scan load.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::ShortenerService;

/// Runs the expiry reaper until the task is aborted.
pub async fn run_reaper(service: Arc<ShortenerService>, interval: Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "Reaper started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so startup load stays flat.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match service.cleanup_expired().await {
            Ok(0) => {
                tracing::debug!("Reaper tick: nothing expired");
            }
            Ok(reaped) => {
                tracing::info!(reaped, "Reaper tick: expired URLs reconciled");
            }
            Err(e) => {
                metrics::counter!("reaper_failures_total").increment(1);
                tracing::warn!(error = %e, "Reaper tick failed, retrying next interval");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::UrlPolicy;
    use crate::domain::repositories::MockUrlRepository;
    use crate::error::AppError;
    use crate::infrastructure::cache::NullCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reaper_service(repo: MockUrlRepository) -> Arc<ShortenerService> {
        Arc::new(ShortenerService::new(
            Arc::new(repo),
            Arc::new(NullCache),
            "http://localhost:8080".to_string(),
            8,
            UrlPolicy::default(),
        ))
    }

    #[tokio::test]
    async fn test_reaper_ticks_repeatedly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut repo = MockUrlRepository::new();
        repo.expect_select_expired().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        });

        let handle = tokio::spawn(run_reaper(
            reaper_service(repo),
            Duration::from_millis(20),
        ));

        tokio::time::sleep(Duration::from_millis(110)).await;
        handle.abort();

        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_reaper_survives_batch_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut repo = MockUrlRepository::new();
        repo.expect_select_expired().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::internal("store down"))
        });

        let handle = tokio::spawn(run_reaper(
            reaper_service(repo),
            Duration::from_millis(20),
        ));

        tokio::time::sleep(Duration::from_millis(110)).await;
        handle.abort();

        // Failures are retried on subsequent ticks, not fatal.
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }
}
