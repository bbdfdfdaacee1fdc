//! Client identity extraction for admission control and analytics.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Extracts the client identity from request headers and the transport peer.
///
/// Preference order:
/// 1. First comma-separated entry of `X-Forwarded-For`, trimmed
/// 2. `X-Real-IP`
/// 3. The transport peer address
///
/// Returns `"unknown"` when none is available (the per-client limiter then
/// treats all such requests as a single client).
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
