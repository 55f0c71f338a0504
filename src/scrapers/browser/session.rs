//! Scoped browser sessions.
//!
//! A session owns one Chromium process (or one DevTools connection to a
//! remote browser) plus the task driving its CDP handler. `close` tears it
//! down explicitly; dropping an unclosed session aborts the handler task
//! and lets chromiumoxide kill the child process.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::handler::Handler;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::BrowserObserverConfig;
use crate::discovery::ObserveError;

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Find a Chrome executable, preferring the configured one.
pub fn find_chrome(configured: Option<&PathBuf>) -> Result<PathBuf, ObserveError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(ObserveError::Launch(format!(
            "configured chrome_path {} does not exist",
            path.display()
        )));
    }

    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            debug!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            debug!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(ObserveError::Launch(
        "Chrome/Chromium not found; install it or set browser.chrome_path".to_string(),
    ))
}

/// One isolated browser session.
pub struct BrowserSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    remote: bool,
    // Dropped after the browser so the profile outlives the process.
    _profile_dir: Option<TempDir>,
}

impl BrowserSession {
    /// Launch a local browser, or connect to the configured remote one.
    pub async fn open(config: &BrowserObserverConfig) -> Result<Self, ObserveError> {
        match config.remote_url {
            Some(ref remote_url) => Self::connect_remote(remote_url).await,
            None => Self::launch(config).await,
        }
    }

    async fn launch(config: &BrowserObserverConfig) -> Result<Self, ObserveError> {
        let chrome_path = find_chrome(config.chrome_path.as_ref())?;
        let profile_dir = tempfile::Builder::new()
            .prefix("vidscout-chrome-")
            .tempdir()
            .map_err(|e| ObserveError::Launch(format!("profile dir: {}", e)))?;

        info!("Launching browser (headless={})", config.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(profile_dir.path());

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-sync")
            .arg("--mute-audio")
            .arg("--autoplay-policy=no-user-gesture-required")
            .arg("--ignore-certificate-errors")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| ObserveError::Launch(format!("invalid browser config: {}", e)))?;

        let (browser, handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ObserveError::Launch(e.to_string()))?;

        Ok(Self {
            browser: Some(browser),
            handler: spawn_handler(handler),
            remote: false,
            _profile_dir: Some(profile_dir),
        })
    }

    async fn connect_remote(url: &str) -> Result<Self, ObserveError> {
        info!("Connecting to remote browser at {}", url);

        // Resolve the WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let version: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ObserveError::Launch(format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| ObserveError::Launch(format!("bad remote version info: {}", e)))?;

        let ws_url = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ObserveError::Launch("no webSocketDebuggerUrl".to_string()))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let (browser, handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| ObserveError::Launch(e.to_string()))?;

        Ok(Self {
            browser: Some(browser),
            handler: spawn_handler(handler),
            remote: true,
            _profile_dir: None,
        })
    }

    /// Open a blank page in this session.
    pub async fn new_page(&self) -> Result<Page, ObserveError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ObserveError::Protocol("browser session already closed".to_string()))?;
        browser
            .new_page("about:blank")
            .await
            .map_err(|e| ObserveError::Protocol(format!("new page: {}", e)))
    }

    /// Tear the session down. Remote browsers are only disconnected.
    pub async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if !self.remote {
                if let Err(e) = browser.close().await {
                    warn!("Browser close failed: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    warn!("Waiting for browser exit failed: {}", e);
                }
            }
        }
        self.handler.abort();
        debug!("Browser session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if self.browser.is_some() {
            debug!("Browser session dropped without close, aborting handler");
        }
        self.handler.abort();
    }
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}
