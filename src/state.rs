//! Application state shared across HTTP handlers.
//!
//! Contains the shortener service, the admission controller, and operational
//! handles. Cloned for each request via Axum's state extraction; cheap to
//! clone due to `Arc` wrapping.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::api::middleware::admission::AdmissionControl;
use crate::application::services::ShortenerService;
use crate::domain::repositories::UrlRepository;
use crate::infrastructure::cache::UrlCache;

/// Shared application state injected into HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub shortener: Arc<ShortenerService>,

    /// Kept alongside the service for health probes.
    pub repository: Arc<dyn UrlRepository>,
    pub cache: Arc<dyn UrlCache>,

    pub admission: Arc<AdmissionControl>,

    /// Renders the Prometheus exposition for `/metrics`.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        shortener: Arc<ShortenerService>,
        repository: Arc<dyn UrlRepository>,
        cache: Arc<dyn UrlCache>,
        admission: Arc<AdmissionControl>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            shortener,
            repository,
            cache,
            admission,
            metrics,
        }
    }
}
