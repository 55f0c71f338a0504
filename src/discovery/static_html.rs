//! Video URL extraction from static markup.
//!
//! Three independent passes over the same document: `<video>`/`<source>`
//! elements, a media-extension regex over the raw text, and quoted URLs in
//! inline player scripts. Results are raw and may repeat; the coordinator
//! normalizes them.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::classifier::is_video_url;
use super::result::{Candidate, CandidateSource};

/// Absolute http(s) URL ending in a media extension, up to the next quote,
/// whitespace, paren or tag bracket. A trailing query string is kept.
pub static MEDIA_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)https?://[^\s"'()<>]+\.(?:mp4|webm|ogg|mov|flv|avi|wmv|m3u8|mpd|ts)\b(?:\?[^\s"'()<>]*)?"#,
    )
    .unwrap()
});

/// Double-quoted absolute URL, allowing JSON-escaped slashes.
static QUOTED_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)"(https?:(?:\\?/){2}[^"\s]+)""#).unwrap());

static VIDEO_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("video").unwrap());
static SOURCE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("source").unwrap());
static SCRIPT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

/// Words that mark an inline script as player-related.
const SCRIPT_MARKERS: &[&str] = &["video", "player", "stream"];

/// Run every static extraction pass over `html`.
pub fn extract_from_html(html: &str) -> Vec<Candidate> {
    let document = Html::parse_document(html);

    let mut candidates = extract_media_elements(&document);
    candidates.extend(scan_media_urls(html));
    candidates.extend(extract_script_urls(&document));
    candidates
}

/// Collect `src` of each `<video>` and of every `<source>` nested inside it.
pub fn extract_media_elements(document: &Html) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for video in document.select(&VIDEO_SELECTOR) {
        if let Some(src) = video.value().attr("src") {
            candidates.push(Candidate::new(src, CandidateSource::VideoElement));
        }
        for source in video.select(&SOURCE_SELECTOR) {
            if let Some(src) = source.value().attr("src") {
                candidates.push(Candidate::new(src, CandidateSource::SourceElement));
            }
        }
    }

    candidates
}

/// Regex scan of raw text for absolute media file URLs.
pub fn scan_media_urls(text: &str) -> Vec<Candidate> {
    MEDIA_URL_PATTERN
        .find_iter(text)
        .map(|m| Candidate::new(m.as_str(), CandidateSource::RawPattern))
        .collect()
}

/// Quoted URLs from inline scripts that mention a player, kept only when
/// they classify as video.
pub fn extract_script_urls(document: &Html) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for script in document.select(&SCRIPT_SELECTOR) {
        let text: String = script.text().collect();
        let lower = text.to_lowercase();
        if !SCRIPT_MARKERS.iter().any(|m| lower.contains(m)) {
            continue;
        }

        for cap in QUOTED_URL_PATTERN.captures_iter(&text) {
            let url = cap[1].replace("\\/", "/");
            if is_video_url(&url) {
                candidates.push(Candidate::new(url, CandidateSource::Script));
            }
        }
    }

    candidates
}
