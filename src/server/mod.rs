//! HTTP API for video discovery and media downloads.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::discovery::{Discovery, DiscoveryOptions};
use crate::scrapers::{BrowserObserver, HttpClient};
use crate::services::JobStore;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub discovery: Arc<Discovery>,
    /// Defaults for requests that do not override them.
    pub discovery_options: DiscoveryOptions,
    pub jobs: JobStore,
    pub ytdlp_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            discovery: Arc::new(build_discovery(settings)?),
            discovery_options: settings.discovery.clone(),
            jobs: JobStore::new(
                settings.downloads_dir.clone(),
                Duration::from_secs(settings.download_retention_secs),
            )
            .with_download_timeout(Duration::from_secs(settings.download_timeout_secs)),
            ytdlp_path: settings.ytdlp_path.clone(),
        })
    }
}

/// Build the discovery coordinator from settings. The browser observer is
/// only attached when browser support is compiled in.
pub fn build_discovery(settings: &Settings) -> anyhow::Result<Discovery> {
    let client = HttpClient::from_settings(settings)?;
    let discovery = Discovery::new(Arc::new(client));

    if cfg!(feature = "browser") {
        let observer = BrowserObserver::new(settings.browser.clone());
        Ok(discovery.with_observer(Arc::new(observer)))
    } else {
        Ok(discovery)
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
