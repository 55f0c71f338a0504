//! Capabilities the discovery coordinator depends on.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::error::{FetchError, ObserveError};
use super::result::Candidate;

/// A page retrieved by a plain HTTP request.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    /// Response headers with lower-cased names.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl FetchedPage {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }
}

/// Retrieves raw page markup without executing scripts.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Loads a page in a live browser session and reports candidate URLs.
///
/// Implementations own the session for the duration of the call and must
/// release it before returning, on every path.
#[async_trait]
pub trait PageObserver: Send + Sync {
    async fn observe(&self, page_url: &str, timeout: Duration)
        -> Result<Vec<Candidate>, ObserveError>;
}
