//! Configuration types for the discovery coordinator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for a single discovery call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// Run the headless browser observer.
    pub use_dynamic: bool,

    /// Time budget for dynamic observation, in milliseconds.
    pub dynamic_timeout_ms: u64,

    /// Fetch the page directly even when dynamic observation succeeded.
    /// When false, the direct fetch only runs if the dynamic path is
    /// disabled or failed.
    pub fallback_to_direct_fetch: bool,

    /// Budget for the whole call, in milliseconds. Each method is capped by it.
    pub overall_timeout_ms: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            use_dynamic: true,
            dynamic_timeout_ms: 30_000,
            fallback_to_direct_fetch: true,
            overall_timeout_ms: 60_000,
        }
    }
}

impl DiscoveryOptions {
    /// Static-only discovery.
    pub fn static_only() -> Self {
        Self {
            use_dynamic: false,
            ..Default::default()
        }
    }

    /// Effective timeout for the browser path.
    pub fn dynamic_timeout(&self) -> Duration {
        Duration::from_millis(self.dynamic_timeout_ms.min(self.overall_timeout_ms))
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }
}
