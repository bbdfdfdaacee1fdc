//! Pre-validation of submitted long URLs.
//!
//! Pure, local checks performed before any store or cache access: length
//! limit, absolute http(s) parse, and the host allow/block lists.

use crate::error::AppError;
use url::Url;

/// Validates a long URL against the configured policy.
///
/// # Checks (in order)
///
/// 1. Length ≤ `max_url_length` → `url_too_long`
/// 2. Parses as an absolute URL with scheme `http`/`https` and a non-empty
///    host → `invalid_url`
/// 3. Host does not substring-match any blocked domain; when the allow list
///    is non-empty, host must substring-match one entry → `url_blocked`
pub fn validate_long_url(
    raw: &str,
    max_url_length: usize,
    allowed_hosts: &[String],
    blocked_domains: &[String],
) -> Result<(), AppError> {
    if raw.is_empty() {
        return Err(AppError::invalid_url("URL must not be empty"));
    }

    if raw.len() > max_url_length {
        return Err(AppError::url_too_long(format!(
            "URL exceeds maximum length of {} characters",
            max_url_length
        )));
    }

    let parsed = Url::parse(raw).map_err(|e| AppError::invalid_url(format!("Invalid URL: {}", e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::invalid_url(format!(
            "Unsupported URL scheme '{}', only http and https are allowed",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::invalid_url("URL must have a host"))?;

    if blocked_domains.iter().any(|b| host.contains(b.as_str())) {
        return Err(AppError::url_blocked(format!(
            "The host '{}' is not allowed",
            host
        )));
    }

    if !allowed_hosts.is_empty() && !allowed_hosts.iter().any(|a| host.contains(a.as_str())) {
        return Err(AppError::url_blocked(format!(
            "The host '{}' is not on the allow list",
            host
        )));
    }

    Ok(())
}
