//! Headless-browser page observer.
//!
//! Loads a page in Chromium over CDP, records video-looking network traffic
//! until the network goes quiet, then inspects the rendered DOM.

mod config;
mod network;
#[cfg(feature = "browser")]
mod observe;
#[cfg(feature = "browser")]
mod session;

pub use config::BrowserObserverConfig;
pub use network::{NetworkLog, Quiescence};
#[cfg(feature = "browser")]
pub use session::{find_chrome, BrowserSession};

use std::time::Duration;

use async_trait::async_trait;

use crate::discovery::{Candidate, ObserveError, PageObserver};

/// Page observer backed by a fresh browser session per call.
#[derive(Debug, Clone, Default)]
pub struct BrowserObserver {
    config: BrowserObserverConfig,
}

impl BrowserObserver {
    pub fn new(config: BrowserObserverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserObserverConfig {
        &self.config
    }
}

/// Cap on tearing a session down once observation is over.
#[cfg(feature = "browser")]
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(feature = "browser")]
#[async_trait]
impl PageObserver for BrowserObserver {
    async fn observe(
        &self,
        page_url: &str,
        timeout: Duration,
    ) -> Result<Vec<Candidate>, ObserveError> {
        let deadline = tokio::time::Instant::now() + timeout;

        let session = tokio::time::timeout_at(deadline, BrowserSession::open(&self.config))
            .await
            .map_err(|_| ObserveError::Launch(format!("timed out after {:?}", timeout)))??;

        let result = tokio::time::timeout_at(deadline, async {
            let page = session.new_page().await?;
            let result = observe::observe_page(&page, page_url, &self.config, deadline).await;
            if let Err(e) = page.close().await {
                tracing::debug!("Page close failed: {}", e);
            }
            result
        })
        .await
        .unwrap_or(Err(ObserveError::NavigationTimeout(timeout)));

        // A close that overruns is dropped, which aborts the session.
        if tokio::time::timeout(CLOSE_TIMEOUT, session.close())
            .await
            .is_err()
        {
            tracing::warn!("Browser close timed out after {:?}", CLOSE_TIMEOUT);
        }

        result
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageObserver for BrowserObserver {
    async fn observe(
        &self,
        _page_url: &str,
        _timeout: Duration,
    ) -> Result<Vec<Candidate>, ObserveError> {
        Err(ObserveError::Unavailable)
    }
}
