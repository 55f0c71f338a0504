//! Heuristic video URL classification.
//!
//! Permissive substring matching. Only applied to candidates an extractor
//! has already narrowed down (script strings, network traffic).

/// Media file extensions treated as video.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".webm", ".ogg", ".mov", ".flv", ".avi", ".wmv", ".m3u8", ".mpd", ".ts",
];

/// Substrings that mark a URL as likely video-related.
pub const VIDEO_KEYWORDS: &[&str] = &["video", "stream", "playlist", "manifest", "content"];

/// Check if a string looks like a video URL.
///
/// Accepts any string, well-formed URL or not.
pub fn is_video_url(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.contains(ext))
        || VIDEO_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Check if a declared content type is a video type.
pub fn is_video_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("video/")
}
