//! Discovery error types.

use std::time::Duration;

use thiserror::Error;

/// Direct page fetch failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Fetch of {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("{0}")]
    Other(String),
}

/// Dynamic (browser) observation failure.
#[derive(Debug, Error)]
pub enum ObserveError {
    #[error("dynamic observation failed: browser launch: {0}")]
    Launch(String),

    #[error("dynamic observation failed: navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    #[error("dynamic observation failed: navigation: {0}")]
    Navigation(String),

    #[error("dynamic observation failed: {0}")]
    Protocol(String),

    #[error("dynamic observation failed: browser support not compiled in")]
    Unavailable,
}

/// Caller-visible discovery failure.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Every extraction method that was attempted failed.
    #[error("All discovery methods failed: {}", causes.join("; "))]
    TotalFailure { causes: Vec<String> },
}

impl DiscoveryError {
    /// Underlying causes, one per failed method.
    pub fn causes(&self) -> &[String] {
        match self {
            DiscoveryError::TotalFailure { causes } => causes,
        }
    }
}
