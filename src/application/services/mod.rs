//! Application services.

mod shortener_service;

pub use shortener_service::{
    CreateRequest, CreatedUrl, OwnerPage, ResolveHints, ShortenerService, UrlPolicy,
};
