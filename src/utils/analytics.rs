//! Analytics hint extraction from request metadata.

/// Classifies a User-Agent string into a coarse device type.
///
/// The buckets are intentionally broad; the click log keeps the raw
/// User-Agent for anything finer-grained.
pub fn device_type(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();

    if ua.contains("bot") || ua.contains("crawler") || ua.contains("spider") {
        "bot"
    } else if ua.contains("ipad") || ua.contains("tablet") {
        "tablet"
    } else if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
        "mobile"
    } else {
        "desktop"
    }
}
