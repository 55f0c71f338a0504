//! Media info and downloads through yt-dlp.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Format selector used when the caller does not pick one.
pub const DEFAULT_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// yt-dlp failures.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("yt-dlp not found: {0}")]
    ToolNotFound(String),

    #[error("yt-dlp failed: {0}")]
    Failed(String),

    #[error("Failed to parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid {field}: {value:?}")]
    InvalidArgument { field: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One downloadable format as reported by yt-dlp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    #[serde(alias = "format_id")]
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default, alias = "format_note")]
    pub format_note: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
}

/// Summary of a media page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Length in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<MediaFormat>,
}

/// A download to perform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub format_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl DownloadRequest {
    /// Check the trim bounds before any work is scheduled.
    pub fn validate(&self) -> Result<(), MediaError> {
        download_section(self).map(|_| ())
    }
}

/// Handle to a yt-dlp binary.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Use the configured binary, or find `yt-dlp` in PATH.
    pub fn locate(configured: Option<&Path>) -> Result<Self, MediaError> {
        if let Some(path) = configured {
            return Ok(Self::new(path));
        }
        which::which("yt-dlp")
            .map(Self::new)
            .map_err(|e| MediaError::ToolNotFound(e.to_string()))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Fetch title, thumbnail, duration and formats without downloading.
    pub async fn fetch_info(&self, url: &str) -> Result<MediaInfo, MediaError> {
        let args = info_args(url);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = self.run(&arg_refs).await?;
        let info: MediaInfo = serde_json::from_slice(&stdout)?;
        debug!("{} has {} formats", url, info.formats.len());
        Ok(info)
    }

    /// Download into `output_dir`, naming the file `<file_stem>.<ext>`.
    /// Returns the path of the written file.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        output_dir: &Path,
        file_stem: &str,
    ) -> Result<PathBuf, MediaError> {
        info!("Downloading media: {}", request.url);

        tokio::fs::create_dir_all(output_dir).await?;

        let output_template = output_dir
            .join(format!("{}.%(ext)s", file_stem))
            .to_string_lossy()
            .to_string();

        let args = build_download_args(request, &output_template)?;
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs).await?;

        find_output(output_dir, file_stem).await
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, MediaError> {
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    MediaError::ToolNotFound(self.binary.display().to_string())
                }
                _ => MediaError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("yt-dlp stderr: {}", stderr);
            return Err(MediaError::Failed(stderr));
        }

        Ok(output.stdout)
    }
}

/// Arguments for a metadata-only run. The URL always follows `--` so it is
/// never read as an option.
fn info_args(url: &str) -> Vec<String> {
    vec![
        "--dump-json".into(),
        "--no-playlist".into(),
        "--no-warnings".into(),
        "--".into(),
        url.into(),
    ]
}

/// Build the yt-dlp argument list for a download.
pub fn build_download_args(
    request: &DownloadRequest,
    output_template: &str,
) -> Result<Vec<String>, MediaError> {
    let format = request
        .format_id
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FORMAT);

    let mut args: Vec<String> = vec![
        "--no-playlist".into(),
        "--format".into(),
        format.into(),
        "--merge-output-format".into(),
        "mp4".into(),
    ];

    if let Some(section) = download_section(request)? {
        args.push("--download-sections".into());
        args.push(section);
        args.push("--force-keyframes-at-cuts".into());
    }

    args.extend([
        "--output".into(),
        output_template.into(),
        "--no-progress".into(),
        "--".into(),
        request.url.clone(),
    ]);

    Ok(args)
}

/// `*start-end` section spec for trimmed downloads, if either bound is set.
fn download_section(request: &DownloadRequest) -> Result<Option<String>, MediaError> {
    let start = checked_timestamp("startTime", request.start_time.as_deref())?;
    let end = checked_timestamp("endTime", request.end_time.as_deref())?;

    Ok(match (start, end) {
        (None, None) => None,
        (start, end) => Some(format!(
            "*{}-{}",
            start.unwrap_or("0"),
            end.unwrap_or("inf")
        )),
    })
}

/// Accepts `SS`, `MM:SS` or `HH:MM:SS`, optionally with fractional seconds.
fn checked_timestamp<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<Option<&'a str>, MediaError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let parts: Vec<&str> = value.split(':').collect();
    let valid = parts.len() <= 3
        && parts.iter().enumerate().all(|(i, part)| {
            let last = i == parts.len() - 1;
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_digit() || (last && c == '.'))
                && part.matches('.').count() <= 1
        });

    if valid {
        Ok(Some(value))
    } else {
        Err(MediaError::InvalidArgument {
            field,
            value: value.to_string(),
        })
    }
}

async fn find_output(output_dir: &Path, file_stem: &str) -> Result<PathBuf, MediaError> {
    let prefix = format!("{}.", file_stem);
    let mut entries = tokio::fs::read_dir(output_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        // Skip yt-dlp intermediates (.part, .ytdl, per-format fragments).
        if name.starts_with(&prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl") {
            info!("Downloaded: {:?}", entry.path());
            return Ok(entry.path());
        }
    }
    Err(MediaError::Failed(format!(
        "downloaded file not found for {}",
        file_stem
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> DownloadRequest {
        DownloadRequest {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_download_args() {
        let args = build_download_args(&request("https://v.example/watch"), "/d/x.%(ext)s").unwrap();
        assert_eq!(args[0], "--no-playlist");
        assert_eq!(args[1], "--format");
        assert_eq!(args[2], DEFAULT_FORMAT);
        assert!(!args.contains(&"--download-sections".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://v.example/watch"));
        assert!(args.windows(2).any(|w| w[0] == "--output" && w[1] == "/d/x.%(ext)s"));
    }

    #[test]
    fn test_format_and_trim() {
        let req = DownloadRequest {
            url: "https://v.example/watch".to_string(),
            format_id: Some("137+140".to_string()),
            start_time: Some("00:01:05".to_string()),
            end_time: Some("90.5".to_string()),
        };
        let args = build_download_args(&req, "out.%(ext)s").unwrap();
        assert_eq!(args[2], "137+140");
        assert!(args
            .windows(2)
            .any(|w| w[0] == "--download-sections" && w[1] == "*00:01:05-90.5"));
        assert!(args.contains(&"--force-keyframes-at-cuts".to_string()));
    }

    #[test]
    fn test_open_ended_trim() {
        let mut req = request("u");
        req.start_time = Some("30".to_string());
        assert_eq!(download_section(&req).unwrap().as_deref(), Some("*30-inf"));

        let mut req = request("u");
        req.end_time = Some("1:00".to_string());
        assert_eq!(download_section(&req).unwrap().as_deref(), Some("*0-1:00"));
    }

    #[test]
    fn test_blank_format_uses_default() {
        let mut req = request("u");
        req.format_id = Some("  ".to_string());
        req.start_time = Some(String::new());
        let args = build_download_args(&req, "o").unwrap();
        assert_eq!(args[2], DEFAULT_FORMAT);
        assert!(!args.contains(&"--download-sections".to_string()));
    }

    #[test]
    fn test_rejects_bad_timestamps() {
        for bad in ["abc", "1:2:3:4", "1::2", "--exec", "1.2.3", "1.5:00"] {
            let mut req = request("u");
            req.start_time = Some(bad.to_string());
            assert!(
                matches!(
                    build_download_args(&req, "o"),
                    Err(MediaError::InvalidArgument { .. })
                ),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_dash_url_stays_positional() {
        let url = "--config-locations=/tmp/x.conf";

        let args = build_download_args(&request(url), "o").unwrap();
        let n = args.len();
        assert_eq!(args[n - 2], "--");
        assert_eq!(args[n - 1], url);
        assert_eq!(args.iter().filter(|a| a.as_str() == url).count(), 1);

        let args = info_args(url);
        let n = args.len();
        assert_eq!(args[n - 2], "--");
        assert_eq!(args[n - 1], url);
    }

    #[test]
    fn test_parse_info() {
        let json = r#"{
            "id": "abc",
            "title": "Clip",
            "thumbnail": "https://i.example/t.jpg",
            "duration": 12.5,
            "formats": [
                {"format_id": "18", "ext": "mp4", "resolution": "640x360", "vcodec": "avc1", "acodec": "mp4a"},
                {"format_id": "140", "ext": "m4a", "resolution": "audio only"}
            ]
        }"#;
        let info: MediaInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.title, "Clip");
        assert_eq!(info.duration, Some(12.5));
        assert_eq!(info.formats.len(), 2);
        assert_eq!(info.formats[0].format_id, "18");

        let out = serde_json::to_value(&info).unwrap();
        assert_eq!(out["formats"][1]["formatId"], "140");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let ytdlp = YtDlp::new("/nonexistent/yt-dlp");
        let err = ytdlp.fetch_info("https://v.example/").await.unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_find_output_skips_partials() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("job.mp4.part"), b"").unwrap();
        std::fs::write(dir.path().join("other.mp4"), b"").unwrap();
        assert!(find_output(dir.path(), "job").await.is_err());

        std::fs::write(dir.path().join("job.mp4"), b"x").unwrap();
        let found = find_output(dir.path(), "job").await.unwrap();
        assert_eq!(found, dir.path().join("job.mp4"));
    }
}
