//! Media info, download and status endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::AppState;
use super::helpers::{error_response, error_with_details, required};
use crate::services::{DownloadJob, DownloadRequest, DownloadStatus, MediaError, YtDlp};

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Debug, Default, Deserialize)]
pub struct InfoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// POST /api/info
pub async fn media_info(
    State(state): State<AppState>,
    body: Result<Json<InfoRequest>, JsonRejection>,
) -> Response {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let Some(url) = required(request.url.as_deref()) else {
        return error_response(StatusCode::BAD_REQUEST, "URL is required");
    };

    let result = match locate_ytdlp(&state) {
        Ok(ytdlp) => ytdlp.fetch_info(url).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(info) => Json(info).into_response(),
        Err(e) => {
            tracing::warn!("Media info failed for {}: {}", url, e);
            error_with_details(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching media info",
                e,
            )
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStarted {
    pub download_id: Uuid,
    pub status: DownloadStatus,
}

/// POST /api/download
pub async fn start_download(
    State(state): State<AppState>,
    body: Result<Json<DownloadBody>, JsonRejection>,
) -> Response {
    let body = body.map(|Json(r)| r).unwrap_or_default();
    let Some(url) = required(body.url.as_deref()) else {
        return error_response(StatusCode::BAD_REQUEST, "URL is required");
    };

    let request = DownloadRequest {
        url: url.to_string(),
        format_id: body.format_id,
        start_time: body.start_time,
        end_time: body.end_time,
    };
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, &e.to_string());
    }

    let ytdlp = match locate_ytdlp(&state) {
        Ok(ytdlp) => ytdlp,
        Err(e) => {
            return error_with_details(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error starting download",
                e,
            )
        }
    };

    let download_id = state.jobs.start(ytdlp, request).await;
    Json(DownloadStarted {
        download_id,
        status: DownloadStatus::Processing,
    })
    .into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub id: Uuid,
    pub status: DownloadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<DownloadJob> for JobStatusResponse {
    fn from(job: DownloadJob) -> Self {
        let file = job.file_name();
        Self {
            id: job.id,
            status: job.status,
            download_url: file.as_ref().map(|name| format!("/downloads/{}", name)),
            file,
            error: job.error,
        }
    }
}

/// GET /api/status/:id
pub async fn download_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let job = match Uuid::parse_str(&id) {
        Ok(id) => state.jobs.get(&id).await,
        Err(_) => None,
    };

    match job {
        Some(job) => Json(JobStatusResponse::from(job)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Download not found"),
    }
}

fn locate_ytdlp(state: &AppState) -> Result<YtDlp, MediaError> {
    YtDlp::locate(state.ytdlp_path.as_deref())
}
