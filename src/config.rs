//! Configuration management for vidscout.
//!
//! Settings start from defaults, are overlaid by an optional TOML file and
//! finally by `VIDSCOUT_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::discovery::DiscoveryOptions;
use crate::scrapers::BrowserObserverConfig;

/// Config file name looked up in the user config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Default lifetime of finished downloads (1 hour).
pub const DEFAULT_DOWNLOAD_RETENTION_SECS: u64 = 3600;

/// Default cap on a single download run (2 hours).
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 7200;

/// Application settings (resolved from config file + env).
#[derive(Debug, Clone)]
pub struct Settings {
    /// User agent for HTTP requests. `None` uses the built-in default,
    /// `"impersonate"` rotates real browser user agents.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Accept self-signed or otherwise invalid TLS certificates.
    pub accept_invalid_certs: bool,
    /// Directory finished downloads are written to and served from.
    pub downloads_dir: PathBuf,
    /// Seconds a finished download (file and status entry) is kept.
    pub download_retention_secs: u64,
    /// Seconds a single yt-dlp download may run before it is failed.
    pub download_timeout_secs: u64,
    /// yt-dlp binary. Looked up in PATH when unset.
    pub ytdlp_path: Option<PathBuf>,
    /// Discovery defaults for requests that do not override them.
    pub discovery: DiscoveryOptions,
    /// Headless browser settings for dynamic observation.
    pub browser: BrowserObserverConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: None,
            request_timeout: 30,
            accept_invalid_certs: true,
            downloads_dir: PathBuf::from("downloads"),
            download_retention_secs: DEFAULT_DOWNLOAD_RETENTION_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            ytdlp_path: None,
            discovery: DiscoveryOptions::default(),
            browser: BrowserObserverConfig::default(),
        }
    }
}

impl Settings {
    /// Ensure the downloads directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.downloads_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create downloads directory '{}': {}",
                    self.downloads_dir.display(),
                    e
                ),
            )
        })
    }
}

/// Configuration file contents. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_invalid_certs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_retention_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ytdlp_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery: Option<DiscoveryOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserObserverConfig>,

    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse TOML config {}: {}", path.display(), e))?;

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(accept) = self.accept_invalid_certs {
            settings.accept_invalid_certs = accept;
        }
        if let Some(ref dir) = self.downloads_dir {
            settings.downloads_dir = resolve_path(dir, base_dir);
        }
        if let Some(secs) = self.download_retention_secs {
            settings.download_retention_secs = secs;
        }
        if let Some(secs) = self.download_timeout_secs {
            settings.download_timeout_secs = secs;
        }
        if let Some(ref path) = self.ytdlp_path {
            settings.ytdlp_path = Some(resolve_path(path, base_dir));
        }
        if let Some(ref discovery) = self.discovery {
            settings.discovery = discovery.clone();
        }
        if let Some(ref browser) = self.browser {
            settings.browser = browser.clone();
        }
    }
}

/// Resolve a path that may be relative to the config file.
/// Paths starting with `~/` are expanded against the home directory.
fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let path = match path_str.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path_str)),
        None => PathBuf::from(path_str),
    };

    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// Default config file location (`<config_dir>/vidscout/config.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vidscout").join(CONFIG_FILENAME))
}

/// Apply `VIDSCOUT_*` overrides read through `lookup`.
fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

    if let Some(ua) = var("VIDSCOUT_USER_AGENT") {
        settings.user_agent = Some(ua);
    }
    if let Some(timeout) = var("VIDSCOUT_REQUEST_TIMEOUT").and_then(|s| s.parse().ok()) {
        settings.request_timeout = timeout;
    }
    if let Some(flag) = var("VIDSCOUT_ACCEPT_INVALID_CERTS") {
        settings.accept_invalid_certs = parse_flag(&flag);
    }
    if let Some(dir) = var("VIDSCOUT_DOWNLOADS_DIR") {
        settings.downloads_dir = PathBuf::from(dir);
    }
    if let Some(secs) = var("VIDSCOUT_DOWNLOAD_RETENTION_SECS").and_then(|s| s.parse().ok()) {
        settings.download_retention_secs = secs;
    }
    if let Some(secs) = var("VIDSCOUT_DOWNLOAD_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
        settings.download_timeout_secs = secs;
    }
    if let Some(path) = var("VIDSCOUT_YTDLP_PATH") {
        settings.ytdlp_path = Some(PathBuf::from(path));
    }
    if let Some(flag) = var("VIDSCOUT_USE_DYNAMIC") {
        settings.discovery.use_dynamic = parse_flag(&flag);
    }
    if let Some(path) = var("VIDSCOUT_CHROME_PATH") {
        settings.browser.chrome_path = Some(PathBuf::from(path));
    }
    if let Some(url) = var("VIDSCOUT_BROWSER_URL") {
        settings.browser.remote_url = Some(url);
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Load settings from the config file (if any) and the environment.
///
/// Priority for the file: explicit path, then `VIDSCOUT_CONFIG`, then the
/// default location. An explicitly named file that cannot be read is an
/// error; a missing default file is not.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, String> {
    let explicit = config_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("VIDSCOUT_CONFIG").map(PathBuf::from));

    let config = match explicit {
        Some(path) => Some(Config::load_from_path(&path)?),
        None => match default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Using config file: {}", path.display());
                Some(Config::load_from_path(&path)?)
            }
            _ => None,
        },
    };

    let mut settings = Settings::default();
    if let Some(config) = config {
        let base_dir = config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        config.apply_to_settings(&mut settings, &base_dir);
    }

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}
