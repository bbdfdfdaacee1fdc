//! Handler for the short URL redirect hot path.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::application::services::ResolveHints;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_identity;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Extract analytics hints (User-Agent, Referer, client IP, country hint)
/// 2. Resolve through the service: cache first, store on miss
/// 3. Respond `301 Moved Permanently` with the `Location` header
///
/// Click recording happens inside the service and never delays the response
/// on the cache-hit path.
///
/// # Errors
///
/// - **404** `url_not_found` - the code does not exist
/// - **410** `url_deleted` / `url_expired` - the code is gone
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let hints = ResolveHints {
        user_agent: header_string(&headers, header::USER_AGENT.as_str()),
        referer: header_string(&headers, header::REFERER.as_str()),
        ip_address: Some(client_identity(&headers, Some(addr))),
        country: header_string(&headers, "cf-ipcountry"),
    };

    let long_url = state.shortener.resolve(&code, hints).await?;

    metrics::counter!("redirects_total").increment(1);

    // 301: permanent redirects let intermediaries cache the hop.
    Ok((
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, long_url)],
    )
        .into_response())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
