//! vidscout - find video URLs on web pages and download media.
//!
//! Discovery combines static markup extraction with observation of a page
//! loaded in a headless browser. The crate also exposes an HTTP API and a
//! small yt-dlp based download service.

pub mod config;
pub mod discovery;
pub mod scrapers;
pub mod server;
pub mod services;

pub use discovery::{Discovery, DiscoveryError, DiscoveryOptions, DiscoveryOutcome};
