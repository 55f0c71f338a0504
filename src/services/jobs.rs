//! Background download tracking.
//!
//! Jobs live in an in-memory map keyed by id. A finished job (file and
//! entry) is removed after the retention period.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::ytdlp::{DownloadRequest, YtDlp};

/// Default cap on a single yt-dlp run (2 hours).
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Download lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Processing,
    Completed,
    Failed,
}

/// A tracked download.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub id: Uuid,
    pub url: String,
    pub status: DownloadStatus,
    /// Written file, once completed.
    pub file: Option<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadJob {
    fn new(id: Uuid, url: String) -> Self {
        Self {
            id,
            url,
            status: DownloadStatus::Processing,
            file: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// File name under the downloads directory.
    pub fn file_name(&self) -> Option<String> {
        self.file
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
    }
}

/// Shared map of download jobs.
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, DownloadJob>>>,
    downloads_dir: PathBuf,
    retention: Duration,
    download_timeout: Duration,
}

impl JobStore {
    pub fn new(downloads_dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            downloads_dir: downloads_dir.into(),
            retention,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    /// Limit how long one download may run before it is marked failed.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    pub async fn get(&self, id: &Uuid) -> Option<DownloadJob> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Register a new job and run it in the background. Returns immediately.
    pub async fn start(&self, ytdlp: YtDlp, request: DownloadRequest) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs
            .write()
            .await
            .insert(id, DownloadJob::new(id, request.url.clone()));

        let store = self.clone();
        tokio::spawn(async move {
            let stem = id.to_string();
            let download = ytdlp.download(&request, &store.downloads_dir, &stem);
            let result = match tokio::time::timeout(store.download_timeout, download).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!(
                    "download timed out after {:?}",
                    store.download_timeout
                )),
            };
            store.finish(id, result).await;
        });

        id
    }

    /// Record the outcome of a job and schedule its removal.
    pub async fn finish(&self, id: Uuid, result: Result<PathBuf, String>) {
        {
            let mut jobs = self.jobs.write().await;
            let Some(job) = jobs.get_mut(&id) else {
                return;
            };
            job.finished_at = Some(Utc::now());
            match result {
                Ok(path) => {
                    info!("Download {} completed: {}", id, path.display());
                    job.status = DownloadStatus::Completed;
                    job.file = Some(path);
                }
                Err(e) => {
                    error!("Download {} failed: {}", id, e);
                    job.status = DownloadStatus::Failed;
                    job.error = Some(e);
                }
            }
        }
        self.schedule_cleanup(id);
    }

    fn schedule_cleanup(&self, id: Uuid) {
        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(store.retention).await;
            store.remove(&id).await;
        });
    }

    /// Drop a job and delete its file.
    pub async fn remove(&self, id: &Uuid) {
        let job = self.jobs.write().await.remove(id);
        if let Some(path) = job.and_then(|j| j.file) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Removed expired download {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => error!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_job() {
        let store = JobStore::new("downloads", Duration::from_secs(60));
        assert!(store.get(&Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_download_is_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path(), Duration::from_secs(60));
        let id = store
            .start(
                YtDlp::new("/nonexistent/yt-dlp"),
                DownloadRequest {
                    url: "https://v.example/".to_string(),
                    ..Default::default()
                },
            )
            .await;

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.url, "https://v.example/");

        let mut status = job.status;
        for _ in 0..100 {
            status = store.get(&id).await.unwrap().status;
            if status != DownloadStatus::Processing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status, DownloadStatus::Failed);
        let job = store.get(&id).await.unwrap();
        assert!(job.error.unwrap().contains("yt-dlp not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_download_fails_after_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("yt-dlp");
        std::fs::write(&script, "#!/bin/sh\nsleep 60\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let store = JobStore::new(dir.path().join("out"), Duration::from_secs(60))
            .with_download_timeout(Duration::from_millis(200));
        let id = store
            .start(
                YtDlp::new(&script),
                DownloadRequest {
                    url: "https://v.example/".to_string(),
                    ..Default::default()
                },
            )
            .await;

        let mut job = store.get(&id).await.unwrap();
        for _ in 0..150 {
            job = store.get(&id).await.unwrap();
            if job.status != DownloadStatus::Processing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(job.status, DownloadStatus::Failed);
        assert!(job.error.unwrap().contains("timed out"));
        assert!(job.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_completed_job_expires() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"data").unwrap();

        let store = JobStore::new(dir.path(), Duration::from_millis(50));
        let id = Uuid::new_v4();
        store
            .jobs
            .write()
            .await
            .insert(id, DownloadJob::new(id, "u".to_string()));

        store.finish(id, Ok(file.clone())).await;
        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, DownloadStatus::Completed);
        assert_eq!(job.file_name().as_deref(), Some("clip.mp4"));
        assert!(job.finished_at.unwrap() >= job.created_at);

        for _ in 0..100 {
            if store.get(&id).await.is_none() && !file.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(store.get(&id).await.is_none());
        assert!(!file.exists());
    }
}
