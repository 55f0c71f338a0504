//! Browser observer configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Headless browser configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserObserverConfig {
    /// Run in headless mode (default: true).
    /// Set to false to watch what the observer does.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium binary. Searched for when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// In-flight request count at or below which the network counts as idle.
    #[serde(default = "default_idle_connections")]
    pub idle_connections: usize,

    /// How long the network must stay idle before the page is considered
    /// settled, in milliseconds.
    #[serde(default = "default_idle_window_ms")]
    pub idle_window_ms: u64,
}

pub fn default_headless() -> bool {
    true
}

pub fn default_idle_connections() -> usize {
    2
}

pub fn default_idle_window_ms() -> u64 {
    500
}

impl Default for BrowserObserverConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            proxy: None,
            chrome_args: Vec::new(),
            remote_url: None,
            idle_connections: default_idle_connections(),
            idle_window_ms: default_idle_window_ms(),
        }
    }
}

impl BrowserObserverConfig {
    pub fn idle_window(&self) -> Duration {
        Duration::from_millis(self.idle_window_ms)
    }
}
