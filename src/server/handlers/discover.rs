//! Video URL discovery endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::super::AppState;
use super::helpers::{error_response, error_with_details, required};
use crate::discovery::{DiscoveryOptions, DiscoveryOutcome};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverRequest {
    #[serde(default)]
    pub page_url: Option<String>,
    /// Overrides the configured `use_dynamic`.
    #[serde(default)]
    pub use_dynamic: Option<bool>,
    /// Overrides the configured overall timeout.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl DiscoverRequest {
    fn options(&self, defaults: &DiscoveryOptions) -> DiscoveryOptions {
        let mut options = defaults.clone();
        if let Some(use_dynamic) = self.use_dynamic {
            options.use_dynamic = use_dynamic;
        }
        if let Some(timeout_ms) = self.timeout_ms.filter(|t| *t > 0) {
            options.overall_timeout_ms = timeout_ms;
        }
        options
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    pub video_urls: Vec<String>,
    pub page_url: String,
    pub count: usize,
}

/// POST /fetch-video-urls and /api/discover
pub async fn discover_videos(
    State(state): State<AppState>,
    body: Result<Json<DiscoverRequest>, JsonRejection>,
) -> Response {
    // Unparseable bodies are treated like an empty one.
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let Some(page_url) = required(request.page_url.as_deref()) else {
        return error_response(StatusCode::BAD_REQUEST, "Page URL is required");
    };
    let options = request.options(&state.discovery_options);

    match state.discovery.discover(page_url, &options).await {
        Ok(DiscoveryOutcome::Found(set)) => {
            let video_urls = set.into_vec();
            Json(DiscoverResponse {
                count: video_urls.len(),
                video_urls,
                page_url: page_url.to_string(),
            })
            .into_response()
        }
        Ok(DiscoveryOutcome::NotFound) => {
            error_response(StatusCode::NOT_FOUND, "No video URLs found on the page")
        }
        Err(e) => error_with_details(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error fetching video URLs",
            e,
        ),
    }
}
