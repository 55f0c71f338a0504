//! Service layer for media lookups and downloads.
//!
//! Used by both the CLI and the web server.

pub mod jobs;
pub mod ytdlp;

pub use jobs::{DownloadJob, DownloadStatus, JobStore};
pub use ytdlp::{DownloadRequest, MediaError, MediaFormat, MediaInfo, YtDlp};
