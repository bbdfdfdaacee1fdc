//! Core business entities.

mod click;
mod short_url;

pub use click::NewClick;
pub use short_url::{NewShortUrl, ShortUrl, UrlMetadata};
