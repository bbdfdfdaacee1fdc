//! HTTP request handlers.

mod admin;
mod health;
mod metrics;
mod redirect;
mod shorten;
mod urls;

pub use admin::cleanup_handler;
pub use health::{healthz_handler, readyz_handler};
pub use metrics::metrics_handler;
pub use redirect::redirect_handler;
pub use shorten::shorten_handler;
pub use urls::{delete_handler, list_urls_handler, metadata_handler};
