//! Dynamic observation of a loaded page.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use futures::{FutureExt, StreamExt};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::BrowserObserverConfig;
use super::network::{NetworkLog, Quiescence};
use crate::discovery::static_html::extract_from_html;
use crate::discovery::{Candidate, CandidateSource, ObserveError};

/// Cap on each post-load step (DOM query, HTML snapshot).
const POST_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// How often the in-flight count is sampled while waiting for quiescence.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Collects media and iframe sources from the live DOM.
const DOM_QUERY_SCRIPT: &str = r#"
    (() => {
        const media = [];
        document.querySelectorAll('video').forEach((video) => {
            if (video.src) media.push(video.src);
            video.querySelectorAll('source').forEach((source) => {
                if (source.src) media.push(source.src);
            });
        });
        const iframes = [];
        document.querySelectorAll('iframe').forEach((frame) => {
            if (frame.src) iframes.push(frame.src);
        });
        return { media, iframes };
    })()
"#;

#[derive(Debug, Default, Deserialize)]
struct DomSources {
    #[serde(default)]
    media: Vec<String>,
    #[serde(default)]
    iframes: Vec<String>,
}

/// Load `url` in `page` and collect candidates from network traffic and the
/// rendered DOM. Page cleanup is handled by the caller.
///
/// Nothing here runs past `deadline`. The network wait ends early enough to
/// leave room for the DOM query and HTML snapshot.
pub(crate) async fn observe_page(
    page: &Page,
    url: &str,
    config: &BrowserObserverConfig,
    deadline: Instant,
) -> Result<Vec<Candidate>, ObserveError> {
    let budget = deadline.saturating_duration_since(Instant::now());
    let wait_until = deadline - post_load_reserve(budget);

    page.execute(EnableParams::default())
        .await
        .map_err(|e| ObserveError::Protocol(format!("enable network: {}", e)))?;

    // Listeners go in before navigation so no early request is missed.
    let mut requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(protocol_error)?;
    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(protocol_error)?;
    let mut finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(protocol_error)?;
    let mut failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(protocol_error)?;

    navigate(page, url, deadline).await?;

    let mut network = NetworkLog::default();
    let mut quiescence = Quiescence::new(config.idle_connections, config.idle_window());
    let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);

    loop {
        tokio::select! {
            Some(event) = requests.next() => {
                network.on_request(event.request_id.inner(), &event.request.url);
            }
            Some(event) = responses.next() => {
                network.on_response(&event.response.url, &event.response.mime_type);
            }
            Some(event) = finished.next() => {
                network.on_complete(event.request_id.inner());
            }
            Some(event) = failed.next() => {
                network.on_complete(event.request_id.inner());
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                if quiescence.sample(network.in_flight(), now.into_std()) {
                    debug!("Network idle for {}", url);
                    break;
                }
                if now >= wait_until {
                    debug!(
                        "Quiescence not reached for {} ({} requests in flight)",
                        url,
                        network.in_flight()
                    );
                    break;
                }
            }
        }
    }

    // Drain whatever was already buffered when the loop ended.
    while let Some(Some(event)) = requests.next().now_or_never() {
        network.on_request(event.request_id.inner(), &event.request.url);
    }
    while let Some(Some(event)) = responses.next().now_or_never() {
        network.on_response(&event.response.url, &event.response.mime_type);
    }

    info!(
        "Observed {} requests while loading {}",
        network.requests_seen(),
        url
    );

    let mut candidates = network.into_candidates();

    match query_dom(page, deadline).await {
        Ok(dom) => {
            candidates.extend(
                dom.media
                    .into_iter()
                    .map(|src| Candidate::new(src, CandidateSource::RenderedDom)),
            );
            candidates.extend(
                dom.iframes
                    .into_iter()
                    .map(|src| Candidate::new(src, CandidateSource::Iframe)),
            );
        }
        Err(e) => warn!("DOM query failed for {}: {}", url, e),
    }

    match tokio::time::timeout_at(step_deadline(deadline), page.content()).await {
        Ok(Ok(html)) => candidates.extend(extract_from_html(&html)),
        Ok(Err(e)) => warn!("Reading rendered HTML failed for {}: {}", url, e),
        Err(_) => warn!("Timed out reading rendered HTML for {}", url),
    }

    Ok(candidates)
}

/// Time held back from the network wait for the post-load steps.
fn post_load_reserve(budget: Duration) -> Duration {
    (POST_LOAD_TIMEOUT * 2).min(budget / 4)
}

fn step_deadline(deadline: Instant) -> Instant {
    deadline.min(Instant::now() + POST_LOAD_TIMEOUT)
}

/// Navigate to a URL, giving up at `deadline`.
async fn navigate(page: &Page, url: &str, deadline: Instant) -> Result<(), ObserveError> {
    let timeout = deadline.saturating_duration_since(Instant::now());
    info!("Navigating to {}", url);
    let nav_params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(ObserveError::Navigation)?;

    let response = tokio::time::timeout_at(deadline, page.execute(nav_params))
        .await
        .map_err(|_| ObserveError::NavigationTimeout(timeout))?
        .map_err(|e| ObserveError::Navigation(format!("{}: {}", url, e)))?;

    if let Some(ref error_text) = response.result.error_text {
        return Err(ObserveError::Navigation(format!("{}: {}", url, error_text)));
    }

    Ok(())
}

async fn query_dom(page: &Page, deadline: Instant) -> Result<DomSources, String> {
    let result = tokio::time::timeout_at(
        step_deadline(deadline),
        page.evaluate(DOM_QUERY_SCRIPT),
    )
    .await
    .map_err(|_| "timed out".to_string())?
    .map_err(|e| e.to_string())?;
    result.into_value().map_err(|e| e.to_string())
}

fn protocol_error(e: chromiumoxide::error::CdpError) -> ObserveError {
    ObserveError::Protocol(e.to_string())
}
