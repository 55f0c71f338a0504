//! HTTP request handlers for the web server.

mod discover;
mod helpers;
mod media;

// Re-export handlers for use by the router
pub use discover::discover_videos;
pub use media::{download_status, health, media_info, start_download};
