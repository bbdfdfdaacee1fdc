//! Admission control: composed global and per-client token buckets.
//!
//! Both buckets are classical continuous-time token buckets: tokens accrue at
//! rate R capped at burst B, and an admit atomically refills then deducts one
//! token. The global bucket is checked first so a hostile client cannot force
//! per-client allocation before the global decision.
//!
//! The per-client table is reader-preferring: lookups take the read lock,
//! inserts take the write lock with a double-checked lookup. Every admit
//! stamps the entry's `last_seen`; a background sweeper evicts entries idle
//! longer than the configured window, so the table cannot grow without bound.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_identity;

/// Interval between eviction passes over the per-client table.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Admission controller limits.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub global_rps: f64,
    pub per_client_rps: f64,
    pub burst: f64,
    /// Per-client entries idle at least this long are evicted by the sweeper.
    pub idle_eviction: Duration,
}

/// A continuous-time token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(burst: f64, now: Instant) -> Self {
        Self {
            tokens: burst,
            last_refill: now,
        }
    }

    /// Refills for elapsed time, then deducts one token if available.
    fn try_take(&mut self, rate: f64, burst: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(burst);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct ClientState {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Global plus per-client admission control.
pub struct AdmissionControl {
    config: AdmissionConfig,
    global: Mutex<TokenBucket>,
    clients: RwLock<HashMap<String, Arc<Mutex<ClientState>>>>,
}

impl AdmissionControl {
    pub fn new(config: AdmissionConfig) -> Self {
        let now = Instant::now();
        Self {
            global: Mutex::new(TokenBucket::new(config.burst, now)),
            clients: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Admits or denies a request for the given client identity.
    ///
    /// Denies when either the global or the client's bucket is out of tokens.
    /// Admission is advisory: the caller maps a denial to 429.
    pub fn allow(&self, client: &str) -> bool {
        let now = Instant::now();

        {
            let mut global = self.global.lock().expect("global bucket poisoned");
            if !global.try_take(self.config.global_rps, self.config.burst, now) {
                metrics::counter!("admission_denied_total", "scope" => "global").increment(1);
                return false;
            }
        }

        let entry = self.client_entry(client, now);
        let mut state = entry.lock().expect("client bucket poisoned");
        state.last_seen = now;

        let admitted = state
            .bucket
            .try_take(self.config.per_client_rps, self.config.burst, now);
        if !admitted {
            metrics::counter!("admission_denied_total", "scope" => "client").increment(1);
        }
        admitted
    }

    /// Evicts entries idle at least the configured window.
    pub fn sweep(&self) {
        let now = Instant::now();
        let idle = self.config.idle_eviction;

        let mut table = self.clients.write().expect("client table poisoned");
        let before = table.len();
        table.retain(|_, entry| {
            let state = entry.lock().expect("client bucket poisoned");
            now.saturating_duration_since(state.last_seen) < idle
        });

        let evicted = before - table.len();
        if evicted > 0 {
            metrics::counter!("admission_clients_evicted_total").increment(evicted as u64);
            tracing::debug!(evicted, remaining = table.len(), "Limiter table swept");
        }
    }

    /// Number of tracked client entries.
    pub fn client_count(&self) -> usize {
        self.clients.read().expect("client table poisoned").len()
    }

    /// Runs the eviction sweeper until the task is aborted.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.sweep();
        }
    }

    /// Hot-path lookup with double-checked insert under the write lock.
    fn client_entry(&self, client: &str, now: Instant) -> Arc<Mutex<ClientState>> {
        if let Some(entry) = self
            .clients
            .read()
            .expect("client table poisoned")
            .get(client)
        {
            return entry.clone();
        }

        let mut table = self.clients.write().expect("client table poisoned");
        table
            .entry(client.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ClientState {
                    bucket: TokenBucket::new(self.config.burst, now),
                    last_seen: now,
                }))
            })
            .clone()
    }
}

/// Axum middleware applying admission control to the public surface.
///
/// The client identity comes from `X-Forwarded-For` (first hop), then
/// `X-Real-IP`, then the transport peer. Denials return 429 with the
/// `rate_limit_exceeded` envelope.
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let client = client_identity(request.headers(), peer);

    if !state.admission.allow(&client) {
        return AppError::rate_limited("Rate limit exceeded, please slow down").into_response();
    }

    next.run(request).await
}
